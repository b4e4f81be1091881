use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmartString;

use crate::census::Snapshot;
use crate::context::{normalize_name, BedType, EventStatus, SnapshotStatus};


/// One continuous hospitalization of one patient, rebuilt from per-day
/// snapshots. A patient can have several of these across a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	/// RUT when known, otherwise `NAME-` plus the normalized name.
	pub key: SmartString,
	pub rut: SmartString,
	pub name: String,
	pub age: Option<u32>,
	pub first_seen: NaiveDate,
	pub last_seen: NaiveDate,
	/// Exit days are exclusive: the patient no longer occupies a bed on them.
	pub discharge_date: Option<NaiveDate>,
	pub transfer_date: Option<NaiveDate>,
	pub status: EventStatus,
	pub is_upc: bool,
	pub was_ever_upc: bool,
	pub diagnosis: String,
	pub bed_type: BedType,
	/// Distinct days the patient was actually observed, ascending.
	pub history: Vec<NaiveDate>,
	/// Bed days, exit day excluded. A still-open stay counts up to its last
	/// observed day.
	pub los: i64,
	/// Bed days inside a reporting window; written by the reporter on its
	/// own copies.
	pub days_in_period: i64,
	pub inconsistencies: Vec<String>,
}

impl Event {
	pub fn exit_date(&self) -> Option<NaiveDate> {
		self.discharge_date.or(self.transfer_date)
	}

	fn open_from(key: &SmartString, s: &Snapshot) -> Self {
		let mut ev = Self {
			key: key.clone(),
			rut: s.rut.clone(),
			name: s.name.clone(),
			age: s.age,
			first_seen: s.date,
			last_seen: s.date,
			discharge_date: None,
			transfer_date: None,
			status: EventStatus::Hospitalized,
			is_upc: s.is_upc,
			was_ever_upc: s.is_upc,
			diagnosis: s.diagnosis.clone(),
			bed_type: s.bed_type.clone(),
			history: vec![s.date],
			los: 0,
			days_in_period: 0,
			inconsistencies: Vec::new(),
		};
		match s.status {
			SnapshotStatus::Hospitalized => (),
			SnapshotStatus::Discharged => {
				ev.discharge_date = Some(s.date);
				ev.status = EventStatus::Discharged;
			},
			SnapshotStatus::Transferred => {
				ev.transfer_date = Some(s.date);
				ev.status = EventStatus::Transferred;
			},
		}
		ev
	}

	fn absorb(&mut self, s: &Snapshot) {
		if self.status == EventStatus::Discharged || self.status == EventStatus::Transferred {
			// a clerk closed the stay but the patient is still in a bed
			let note = match (self.discharge_date, self.transfer_date) {
				(Some(d), _) => format!(
					"Alta explícita del {} revertida por ocupación posterior del {}",
					fmt_date(d),
					fmt_date(s.date),
				),
				(_, Some(d)) => format!(
					"Traslado explícito del {} revertido por ocupación posterior del {}",
					fmt_date(d),
					fmt_date(s.date),
				),
				_ => format!("Cierre revertido por ocupación posterior del {}", fmt_date(s.date)),
			};
			self.inconsistencies.push(note);
			self.discharge_date = None;
			self.transfer_date = None;
			self.status = EventStatus::Hospitalized;
		}

		self.last_seen = s.date;
		if self.history.last() != Some(&s.date) {
			self.history.push(s.date);
		}
		self.bed_type = s.bed_type.clone();
		self.is_upc = s.is_upc;
		if s.is_upc {
			self.was_ever_upc = true;
		}
		if s.diagnosis.len() > self.diagnosis.len() {
			self.diagnosis = s.diagnosis.clone();
		}
		if s.age.is_some() {
			self.age = s.age;
		}

		match s.status {
			SnapshotStatus::Hospitalized => (),
			SnapshotStatus::Discharged => {
				self.discharge_date = Some(s.date);
				self.status = EventStatus::Discharged;
			},
			SnapshotStatus::Transferred => {
				self.transfer_date = Some(s.date);
				self.status = EventStatus::Transferred;
			},
		}
	}

	// coverage stopped: the patient left the day after the last sighting
	fn close_implicit(&mut self) {
		if self.status == EventStatus::Hospitalized || self.status == EventStatus::Unknown {
			self.discharge_date = Some(self.last_seen + Duration::days(1));
			self.status = EventStatus::Discharged;
		}
	}

	fn finalize(&mut self, global_max: NaiveDate) {
		if self.status == EventStatus::Hospitalized && self.last_seen < global_max {
			self.close_implicit();
		}
	}

	fn finish_los(&mut self) {
		let end = self.exit_date().unwrap_or(self.last_seen);
		let days = (end - self.first_seen).num_days();
		self.los = if self.history.is_empty() { days.max(0) } else { days.max(1) };
	}
}

fn fmt_date(d: NaiveDate) -> String {
	d.format("%d-%m-%Y").to_string()
}


// Two rows for the same patient on the same day (a bed change, usually)
// collapse into one observation.
fn consolidate_days(snaps: Vec<Snapshot>) -> Vec<Snapshot> {
	let mut out: Vec<Snapshot> = Vec::with_capacity(snaps.len());
	for s in snaps {
		match out.last_mut() {
			Some(prev) if prev.date == s.date => {
				prev.is_upc |= s.is_upc;
				if prev.status == SnapshotStatus::Hospitalized
					&& s.status != SnapshotStatus::Hospitalized
				{
					prev.status = s.status;
				}
				if s.diagnosis.len() > prev.diagnosis.len() {
					prev.diagnosis = s.diagnosis;
				}
				if s.bed_type != BedType::Indefinido {
					prev.bed_type = s.bed_type;
				}
				if s.age.is_some() {
					prev.age = s.age;
				}
			},
			_ => out.push(s),
		}
	}
	out
}


fn segment_group(key: &SmartString, snaps: Vec<Snapshot>, global_max: NaiveDate, out: &mut Vec<Event>) {
	let mut current: Option<Event> = None;
	for s in snaps {
		current = match current {
			None => Some(Event::open_from(key, &s)),
			Some(mut ev) => {
				let gap_days = (s.date - ev.last_seen).num_days() - 1;
				if gap_days > 1 {
					// a Fri -> Mon jump is continuous; anything longer splits
					ev.close_implicit();
					ev.finish_los();
					let prev_last = ev.last_seen;
					out.push(ev);
					let mut next = Event::open_from(key, &s);
					next.inconsistencies.push(format!(
						"Reingreso no adyacente: la misma identidad ya estuvo hospitalizada hasta el {}",
						fmt_date(prev_last),
					));
					Some(next)
				} else {
					ev.absorb(&s);
					Some(ev)
				}
			},
		};
	}
	if let Some(mut ev) = current.take() {
		ev.finalize(global_max);
		ev.finish_los();
		out.push(ev);
	}
}


/// Rebuild hospitalization events from a pile of snapshots, possibly drawn
/// from many workbooks. Never fails; clerical repairs are annotated on the
/// affected events.
pub fn reconcile(mut snapshots: Vec<Snapshot>) -> Vec<Event> {
	let global_max = match snapshots.iter().map(|s| s.date).max() {
		Some(d) => d,
		None => return Vec::new(),
	};
	snapshots.sort_by_key(|s| s.date);

	// first pass: any row carrying a plausible RUT teaches us the name
	let mut rut_by_name: HashMap<String, SmartString> = HashMap::new();
	for s in snapshots.iter() {
		if s.rut.len() > 3 {
			let nname = normalize_name(&s.name);
			if !nname.is_empty() {
				rut_by_name.entry(nname).or_insert_with(|| s.rut.clone());
			}
		}
	}

	// second pass: back-fill missing RUTs and partition by identity,
	// preserving the date order inside each group
	let mut groups: HashMap<SmartString, Vec<Snapshot>> = HashMap::new();
	let mut order: Vec<SmartString> = Vec::new();
	for mut s in snapshots {
		let nname = normalize_name(&s.name);
		if s.rut.is_empty() {
			if let Some(rut) = rut_by_name.get(&nname) {
				s.rut = rut.clone();
			}
		}
		let key: SmartString = if s.rut.is_empty() {
			let mut k = SmartString::from("NAME-");
			k.push_str(&nname);
			k
		} else {
			s.rut.clone()
		};
		if !groups.contains_key(&key) {
			order.push(key.clone());
		}
		groups.entry(key).or_insert_with(Vec::new).push(s);
	}

	let mut events = Vec::new();
	for key in order {
		let snaps = match groups.remove(&key) {
			Some(v) => v,
			None => continue,
		};
		let consolidated = consolidate_days(snaps);
		segment_group(&key, consolidated, global_max, &mut events);
	}
	events
}
