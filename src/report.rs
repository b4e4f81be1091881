use std::collections::HashSet;

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::context::EventStatus;
use crate::reconcile::Event;
use crate::timeseries::TimeSeries;


/// Default window of the rolling monthly overview: three years.
pub const MONTHLY_REPORT_CAP: usize = 36;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Stat {
	Occupied,
	OccupiedUpc,
	OccupiedOther,
	Admissions,
	Discharges,
	Transfers,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
	pub date: NaiveDate,
	pub total_occupancy: u64,
	pub upc_occupancy: u64,
	pub non_upc_occupancy: u64,
	pub admissions: u64,
	pub discharges: u64,
	pub transfers: u64,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
	pub title: String,
	pub start: NaiveDate,
	pub end: NaiveDate,
	/// Private copies of the overlapping events; `days_in_period` is set on
	/// these, never on the caller's events.
	pub patients: Vec<Event>,
	pub daily: Vec<DailyStats>,
	pub total_admissions: usize,
	/// Transfers are counted separately and excluded here.
	pub total_discharges: u64,
	pub total_upc_patients: usize,
	pub avg_los: f64,
	/// Always zero: no bed-capacity denominator is supplied.
	pub occupancy_rate: f64,
}


fn round1(v: f64) -> f64 {
	(v * 10.0).round() / 10.0
}

/// Build the report for `[start, end]` (both inclusive), or `None` when no
/// event overlaps the window. Bed days follow the Chilean norm: the exit day
/// does not count.
pub fn report_for_period(events: &[Event], title: &str, start: NaiveDate, end: NaiveDate) -> Option<Report> {
	if end < start {
		return None
	}
	let mut patients: Vec<Event> = events
		.iter()
		.filter(|ev| ev.first_seen <= end && ev.exit_date().map_or(true, |x| x >= start))
		.cloned()
		.collect();
	if patients.is_empty() {
		return None
	}

	// days that have not happened yet carry no census
	let today = Local::now().date_naive();
	let series_end = if end < today { end } else { today };
	let mut series: TimeSeries<Stat, u64> = TimeSeries::new(start, series_end + Duration::days(1));

	for ev in patients.iter_mut() {
		let exit = ev.exit_date();
		if ev.first_seen >= start && ev.first_seen <= end {
			if let Some(i) = series.date_index(ev.first_seen) {
				series.get_or_create(Stat::Admissions)[i] += 1;
			}
		}
		if let Some(x) = exit {
			if x >= start && x <= end {
				if let Some(i) = series.date_index(x) {
					let stat = if ev.status == EventStatus::Transferred {
						Stat::Transfers
					} else {
						Stat::Discharges
					};
					series.get_or_create(stat)[i] += 1;
				}
			}
		}

		let mut days = 0i64;
		for i in 0..series.len() {
			let d = match series.index_date(i) {
				Some(d) => d,
				None => break,
			};
			let occupied = ev.first_seen <= d && exit.map_or(true, |x| d < x);
			if occupied {
				let stat = if ev.is_upc { Stat::OccupiedUpc } else { Stat::OccupiedOther };
				series.get_or_create(stat)[i] += 1;
				days += 1;
			}
		}
		ev.days_in_period = days;
	}
	series.synthesize(&[&Stat::OccupiedUpc, &Stat::OccupiedOther], Stat::Occupied);

	let total_admissions = patients
		.iter()
		.filter(|ev| ev.first_seen >= start && ev.first_seen <= end)
		.count();
	let total_discharges = series.total(&Stat::Discharges);
	let total_upc_patients = patients
		.iter()
		.filter(|ev| ev.was_ever_upc)
		.map(|ev| &ev.key)
		.collect::<HashSet<_>>()
		.len();

	let mut ended = 0usize;
	let mut los_sum = 0i64;
	for ev in patients.iter() {
		if let Some(x) = ev.exit_date() {
			if x >= start && x <= end {
				ended += 1;
				los_sum += ev.los;
			}
		}
	}
	let avg_los = if ended == 0 {
		0.0
	} else {
		round1(los_sum as f64 / ended as f64)
	};

	let mut daily: Vec<DailyStats> = Vec::with_capacity(series.len());
	for i in 0..series.len() {
		let date = match series.index_date(i) {
			Some(d) => d,
			None => break,
		};
		daily.push(DailyStats {
			date,
			total_occupancy: series.get_value(&Stat::Occupied, i).unwrap_or(0),
			upc_occupancy: series.get_value(&Stat::OccupiedUpc, i).unwrap_or(0),
			non_upc_occupancy: series.get_value(&Stat::OccupiedOther, i).unwrap_or(0),
			admissions: series.get_value(&Stat::Admissions, i).unwrap_or(0),
			discharges: series.get_value(&Stat::Discharges, i).unwrap_or(0),
			transfers: series.get_value(&Stat::Transfers, i).unwrap_or(0),
		});
	}
	// quiet tail days say nothing
	while let Some(last) = daily.last() {
		let movement = last.admissions + last.discharges + last.transfers;
		if last.total_occupancy == 0 && movement == 0 {
			daily.pop();
		} else {
			break
		}
	}

	Some(Report {
		title: title.to_string(),
		start,
		end,
		patients,
		daily,
		total_admissions,
		total_discharges,
		total_upc_patients,
		avg_los,
		occupancy_rate: 0.0,
	})
}


static MES_TITULO: [&str; 12] = [
	"Enero",
	"Febrero",
	"Marzo",
	"Abril",
	"Mayo",
	"Junio",
	"Julio",
	"Agosto",
	"Septiembre",
	"Octubre",
	"Noviembre",
	"Diciembre",
];

fn month_title(year: i32, month: u32) -> String {
	format!("{} {}", MES_TITULO[(month - 1) as usize], year)
}

fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
	NaiveDate::from_ymd_opt(year, month, 1)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
	if month == 12 {
		(year + 1, 1)
	} else {
		(year, month + 1)
	}
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
	let (ny, nm) = next_month(year, month);
	Some(month_start(ny, nm)? - Duration::days(1))
}

// latest day an event can influence a report
fn event_horizon(ev: &Event) -> NaiveDate {
	match ev.exit_date() {
		Some(x) if x > ev.last_seen => x,
		_ => ev.last_seen,
	}
}


/// One report per non-empty calendar month across the event range, keeping
/// only the `cap` most recent months.
pub fn monthly_reports_capped(events: &[Event], cap: usize) -> Vec<Report> {
	let first = events.iter().map(|ev| ev.first_seen).min();
	let last = events.iter().map(event_horizon).max();
	let (first, last) = match (first, last) {
		(Some(a), Some(b)) => (a, b),
		_ => return Vec::new(),
	};

	let mut months: Vec<(i32, u32)> = Vec::new();
	let (mut y, mut m) = (first.year(), first.month());
	loop {
		months.push((y, m));
		if (y, m) >= (last.year(), last.month()) {
			break
		}
		let (ny, nm) = next_month(y, m);
		y = ny;
		m = nm;
	}

	let skip = months.len().saturating_sub(cap);
	let mut out = Vec::new();
	for (y, m) in months.into_iter().skip(skip) {
		let (start, end) = match (month_start(y, m), month_end(y, m)) {
			(Some(s), Some(e)) => (s, e),
			_ => continue,
		};
		if let Some(r) = report_for_period(events, &month_title(y, m), start, end) {
			out.push(r);
		}
	}
	out
}

pub fn monthly_reports(events: &[Event]) -> Vec<Report> {
	monthly_reports_capped(events, MONTHLY_REPORT_CAP)
}

pub fn quarterly_report(events: &[Event], year: i32, quarter: u32) -> Option<Report> {
	if quarter < 1 || quarter > 4 {
		return None
	}
	let first_month = 3 * (quarter - 1) + 1;
	let start = month_start(year, first_month)?;
	let end = month_end(year, first_month + 2)?;
	report_for_period(events, &format!("Trimestre {} {}", quarter, year), start, end)
}

/// Whole-year report, clamped to the span the events actually cover.
pub fn yearly_report(events: &[Event], year: i32) -> Option<Report> {
	let first = events.iter().map(|ev| ev.first_seen).min()?;
	let last = events.iter().map(event_horizon).max()?;
	let y0 = NaiveDate::from_ymd_opt(year, 1, 1)?;
	let y1 = NaiveDate::from_ymd_opt(year, 12, 31)?;
	let start = if first > y0 { first } else { y0 };
	let end = if last < y1 { last } else { y1 };
	if end < start {
		return None
	}
	report_for_period(events, &format!("Año {}", year), start, end)
}

pub fn range_report(
	events: &[Event],
	start_year: i32,
	start_month: u32,
	end_year: i32,
	end_month: u32,
) -> Option<Report> {
	let start = month_start(start_year, start_month)?;
	let end = month_end(end_year, end_month)?;
	if end < start {
		return None
	}
	let title = format!(
		"{} a {}",
		month_title(start_year, start_month),
		month_title(end_year, end_month),
	);
	report_for_period(events, &title, start, end)
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::BedType;

	fn d(month: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(2025, month, day).expect("valid test date")
	}

	fn ev(key: &str, first: NaiveDate, last: NaiveDate, discharge: Option<NaiveDate>, status: EventStatus) -> Event {
		let mut e = Event {
			key: key.into(),
			rut: key.into(),
			name: String::from("PEREZ JUAN"),
			age: Some(40),
			first_seen: first,
			last_seen: last,
			discharge_date: discharge,
			transfer_date: None,
			status,
			is_upc: false,
			was_ever_upc: false,
			diagnosis: String::from("DX"),
			bed_type: BedType::Media,
			history: vec![first],
			los: 0,
			days_in_period: 0,
			inconsistencies: Vec::new(),
		};
		let end = e.exit_date().unwrap_or(last);
		e.los = (end - first).num_days().max(1);
		e
	}

	#[test]
	fn discharge_day_is_not_a_bed_day() {
		let events = vec![ev("19", d(1, 1), d(1, 4), Some(d(1, 4)), EventStatus::Discharged)];
		let r = report_for_period(&events, "enero", d(1, 1), d(1, 31)).expect("report");
		assert_eq!(r.daily[0].total_occupancy, 1);
		assert_eq!(r.daily[2].total_occupancy, 1);
		assert_eq!(r.daily[3].total_occupancy, 0);
		assert_eq!(r.daily[3].discharges, 1);
		assert_eq!(r.patients[0].days_in_period, 3);
		// everything after the discharge day is quiet and trimmed
		assert_eq!(r.daily.len(), 4);
		assert_eq!(r.total_admissions, 1);
		assert_eq!(r.total_discharges, 1);
		assert_eq!(r.avg_los, 3.0);
	}

	#[test]
	fn no_overlap_yields_none() {
		let events = vec![ev("19", d(1, 1), d(1, 4), Some(d(1, 4)), EventStatus::Discharged)];
		assert!(report_for_period(&events, "marzo", d(3, 1), d(3, 31)).is_none());
	}

	#[test]
	fn still_admitted_occupies_through_window_end() {
		let events = vec![ev("19", d(1, 30), d(1, 31), None, EventStatus::Hospitalized)];
		let r = report_for_period(&events, "enero", d(1, 1), d(1, 31)).expect("report");
		assert_eq!(r.daily.len(), 31);
		assert_eq!(r.daily[29].total_occupancy, 1);
		assert_eq!(r.daily[30].total_occupancy, 1);
		assert_eq!(r.patients[0].days_in_period, 2);
		assert_eq!(r.avg_los, 0.0);
	}

	#[test]
	fn transfers_do_not_count_as_discharges() {
		let mut e = ev("19", d(1, 1), d(1, 5), None, EventStatus::Transferred);
		e.transfer_date = Some(d(1, 5));
		e.los = 4;
		let r = report_for_period(&[e], "enero", d(1, 1), d(1, 31)).expect("report");
		assert_eq!(r.total_discharges, 0);
		assert_eq!(r.daily[4].transfers, 1);
		assert_eq!(r.daily[4].discharges, 0);
		// the stay still ended inside the window
		assert_eq!(r.avg_los, 4.0);
	}

	#[test]
	fn upc_occupancy_is_split_out() {
		let mut a = ev("19", d(1, 1), d(1, 3), Some(d(1, 3)), EventStatus::Discharged);
		a.is_upc = true;
		a.was_ever_upc = true;
		let b = ev("29", d(1, 1), d(1, 3), Some(d(1, 3)), EventStatus::Discharged);
		let r = report_for_period(&[a, b], "enero", d(1, 1), d(1, 31)).expect("report");
		assert_eq!(r.daily[0].upc_occupancy, 1);
		assert_eq!(r.daily[0].non_upc_occupancy, 1);
		assert_eq!(r.daily[0].total_occupancy, 2);
		assert_eq!(r.total_upc_patients, 1);
	}

	#[test]
	fn events_straddling_the_window_are_counted_without_admission() {
		// admitted in December, still in bed in January
		let prev = NaiveDate::from_ymd_opt(2024, 12, 20).expect("valid test date");
		let events = vec![ev("19", prev, d(1, 2), Some(d(1, 3)), EventStatus::Discharged)];
		let r = report_for_period(&events, "enero", d(1, 1), d(1, 31)).expect("report");
		assert_eq!(r.total_admissions, 0);
		assert_eq!(r.daily[0].total_occupancy, 1);
		assert_eq!(r.daily[1].total_occupancy, 1);
		assert_eq!(r.patients[0].days_in_period, 2);
		let daily_admissions: u64 = r.daily.iter().map(|s| s.admissions).sum();
		assert!(daily_admissions as usize <= r.total_admissions);
	}

	#[test]
	fn reports_do_not_leak_into_each_other_or_the_input() {
		let events = vec![ev("19", d(1, 1), d(2, 10), None, EventStatus::Hospitalized)];
		let jan = report_for_period(&events, "enero", d(1, 1), d(1, 31)).expect("report");
		let feb = report_for_period(&events, "febrero", d(2, 1), d(2, 28)).expect("report");
		assert_eq!(jan.patients[0].days_in_period, 31);
		assert_eq!(feb.patients[0].days_in_period, 28);
		assert_eq!(events[0].days_in_period, 0);
	}

	#[test]
	fn monthly_reports_cover_the_event_range() {
		let events = vec![
			ev("19", d(1, 10), d(1, 12), Some(d(1, 13)), EventStatus::Discharged),
			ev("29", d(3, 5), d(3, 9), Some(d(3, 10)), EventStatus::Discharged),
		];
		let reports = monthly_reports(&events);
		assert_eq!(reports.len(), 2);
		assert_eq!(reports[0].title, "Enero 2025");
		assert_eq!(reports[1].title, "Marzo 2025");
	}

	#[test]
	fn monthly_cap_keeps_the_most_recent_months() {
		let events = vec![
			ev("19", d(1, 10), d(1, 12), Some(d(1, 13)), EventStatus::Discharged),
			ev("29", d(2, 5), d(2, 9), Some(d(2, 10)), EventStatus::Discharged),
			ev("39", d(3, 5), d(3, 9), Some(d(3, 10)), EventStatus::Discharged),
		];
		let reports = monthly_reports_capped(&events, 2);
		assert_eq!(reports.len(), 2);
		assert_eq!(reports[0].title, "Febrero 2025");
		assert_eq!(reports[1].title, "Marzo 2025");
	}

	#[test]
	fn quarterly_window_is_three_months() {
		let events = vec![ev("19", d(5, 10), d(5, 12), Some(d(5, 13)), EventStatus::Discharged)];
		let r = quarterly_report(&events, 2025, 2).expect("report");
		assert_eq!(r.start, d(4, 1));
		assert_eq!(r.end, d(6, 30));
		assert!(quarterly_report(&events, 2025, 5).is_none());
	}

	#[test]
	fn yearly_report_clamps_to_observed_span() {
		let events = vec![ev("19", d(6, 10), d(6, 20), Some(d(6, 21)), EventStatus::Discharged)];
		let r = yearly_report(&events, 2025).expect("report");
		assert_eq!(r.start, d(6, 10));
		assert_eq!(r.end, d(6, 21));
		assert!(yearly_report(&events, 2023).is_none());
	}

	#[test]
	fn range_report_spans_whole_months() {
		let events = vec![ev("19", d(2, 10), d(2, 12), Some(d(2, 13)), EventStatus::Discharged)];
		let r = range_report(&events, 2025, 1, 2025, 3).expect("report");
		assert_eq!(r.start, d(1, 1));
		assert_eq!(r.end, d(3, 31));
		assert!(range_report(&events, 2025, 3, 2025, 1).is_none());
	}
}
