use std::io;

use chrono::NaiveDate;

use crate::reconcile::Event;
use crate::report::Report;


/// Column order of the per-report patient sheet consumed by the UI layer.
pub static REPORT_COLUMNS: [&str; 14] = [
	"RUT",
	"Nombre",
	"Edad",
	"Diagnóstico",
	"Tipo Cama Final",
	"Pasó por UPC",
	"Es UPC Actualmente",
	"Fecha Ingreso",
	"Fecha Egreso",
	"Fecha Última Vista",
	"Estado Final",
	"Estadía Total (Días)",
	"Días Cama Periodo",
	"Inconsistencias",
];

fn fmt_date(d: NaiveDate) -> String {
	d.format("%d-%m-%Y").to_string()
}

fn fmt_opt_date(d: Option<NaiveDate>) -> String {
	d.map(fmt_date).unwrap_or_default()
}

fn si_no(v: bool) -> &'static str {
	if v {
		"SI"
	} else {
		"NO"
	}
}

pub fn patient_row(ev: &Event) -> Vec<String> {
	vec![
		ev.rut.to_string(),
		ev.name.clone(),
		ev.age.map(|a| a.to_string()).unwrap_or_default(),
		ev.diagnosis.clone(),
		ev.bed_type.to_string(),
		si_no(ev.was_ever_upc).to_string(),
		si_no(ev.is_upc).to_string(),
		fmt_date(ev.first_seen),
		fmt_opt_date(ev.exit_date()),
		fmt_date(ev.last_seen),
		ev.status.to_string(),
		ev.los.to_string(),
		ev.days_in_period.to_string(),
		ev.inconsistencies.join("; "),
	]
}

/// Write one report as CSV, one row per selected patient, in the column
/// order of [`REPORT_COLUMNS`].
pub fn write_report_csv<W: io::Write>(report: &Report, w: W) -> csv::Result<()> {
	let mut w = csv::Writer::from_writer(w);
	w.write_record(&REPORT_COLUMNS)?;
	for ev in report.patients.iter() {
		w.write_record(&patient_row(ev))?;
	}
	w.flush()?;
	Ok(())
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::{BedType, EventStatus};

	fn sample_event() -> Event {
		Event {
			key: "123456789".into(),
			rut: "123456789".into(),
			name: String::from("PEREZ JUAN"),
			age: Some(63),
			first_seen: NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid test date"),
			last_seen: NaiveDate::from_ymd_opt(2025, 11, 4).expect("valid test date"),
			discharge_date: NaiveDate::from_ymd_opt(2025, 11, 4),
			transfer_date: None,
			status: EventStatus::Discharged,
			is_upc: false,
			was_ever_upc: true,
			diagnosis: String::from("NEUMONIA, GRAVE"),
			bed_type: BedType::Uci,
			history: Vec::new(),
			los: 3,
			days_in_period: 3,
			inconsistencies: vec![String::from("nota")],
		}
	}

	#[test]
	fn row_matches_column_layout() {
		let row = patient_row(&sample_event());
		assert_eq!(row.len(), REPORT_COLUMNS.len());
		assert_eq!(row[0], "123456789");
		assert_eq!(row[5], "SI");
		assert_eq!(row[6], "NO");
		assert_eq!(row[7], "01-11-2025");
		assert_eq!(row[8], "04-11-2025");
		assert_eq!(row[10], "Alta");
		assert_eq!(row[11], "3");
	}

	#[test]
	fn csv_output_quotes_embedded_commas() {
		let report = Report {
			title: String::from("Noviembre 2025"),
			start: NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid test date"),
			end: NaiveDate::from_ymd_opt(2025, 11, 30).expect("valid test date"),
			patients: vec![sample_event()],
			daily: Vec::new(),
			total_admissions: 1,
			total_discharges: 1,
			total_upc_patients: 1,
			avg_los: 3.0,
			occupancy_rate: 0.0,
		};
		let mut buf = Vec::new();
		write_report_csv(&report, &mut buf).expect("write csv");
		let text = String::from_utf8(buf).expect("utf8 csv");
		let mut lines = text.lines();
		assert!(lines.next().expect("header").starts_with("RUT,Nombre,Edad"));
		let row = lines.next().expect("data row");
		assert!(row.contains("\"NEUMONIA, GRAVE\""));
		assert_eq!(lines.next(), None);
	}
}
