use std::collections::HashMap;
use std::hash::Hash;

use chrono::NaiveDate;
use num_traits::Zero;


pub trait SeriesKey: Hash + Eq + Clone + std::fmt::Debug {}
impl<T: Hash + Eq + Clone + std::fmt::Debug> SeriesKey for T {}


/// Dense per-day counters sharing one date range. Index 0 is `start`; the
/// range is half-open at `last`.
#[derive(Debug, Clone)]
pub struct TimeSeries<T: Hash + Eq, V: Copy> {
	start: NaiveDate,
	keys: HashMap<T, usize>,
	series: Vec<Vec<V>>,
	len: usize,
}

impl<T: Hash + Eq, V: Copy> TimeSeries<T, V> {
	pub fn new(start: NaiveDate, last: NaiveDate) -> Self {
		let len = (last - start).num_days();
		let len = if len < 0 { 0 } else { len as usize };
		Self {
			start,
			len,
			keys: HashMap::new(),
			series: Vec::new(),
		}
	}

	#[inline(always)]
	pub fn date_index(&self, other: NaiveDate) -> Option<usize> {
		let days = (other - self.start).num_days();
		if days < 0 || days as usize >= self.len {
			return None
		}
		Some(days as usize)
	}

	#[inline(always)]
	pub fn index_date(&self, i: usize) -> Option<NaiveDate> {
		if i >= self.len {
			return None
		}
		Some(self.start + chrono::Duration::days(i as i64))
	}

	#[inline(always)]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline(always)]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}
}

impl<T: SeriesKey, V: Copy + Zero> TimeSeries<T, V> {
	pub fn get_or_create(&mut self, k: T) -> &mut [V] {
		let index = self.get_index_or_create(k);
		&mut self.series[index][..]
	}

	fn get_index_or_create(&mut self, k: T) -> usize {
		match self.keys.get(&k) {
			Some(v) => *v,
			None => {
				let v = self.series.len();
				self.series.push(vec![V::zero(); self.len]);
				self.keys.insert(k, v);
				v
			},
		}
	}

	pub fn get(&self, k: &T) -> Option<&[V]> {
		let index = *self.keys.get(k)?;
		Some(&self.series[index][..])
	}

	pub fn get_value(&self, k: &T, i: usize) -> Option<V> {
		if i >= self.len {
			return None
		}
		self.get(k).map(|v| v[i])
	}
}

impl<T: SeriesKey> TimeSeries<T, u64> {
	/// Store under `kout` the day-wise sum of the series named in `kin`.
	pub fn synthesize(&mut self, kin: &[&T], kout: T) {
		let mut acc = vec![0u64; self.len];
		for k in kin {
			let ts = match self.get(k) {
				Some(ts) => ts,
				None => continue,
			};
			for (dst, src) in acc.iter_mut().zip(ts.iter()) {
				*dst += *src;
			}
		}
		let index = self.get_index_or_create(kout);
		self.series[index] = acc;
	}

	pub fn total(&self, k: &T) -> u64 {
		self.get(k).map(|v| v.iter().sum()).unwrap_or(0)
	}
}
