use chrono::NaiveDate;

use censo::{
	extract_workbook, monthly_reports, reconcile, report_for_period, write_report_csv, Cell,
	EventStatus, Sheet, SnapshotStatus, Workbook,
};


fn t(s: &str) -> Cell {
	Cell::Text(s.into())
}

fn header() -> Vec<Cell> {
	vec![t("RUT"), t("NOMBRE PACIENTE"), t("EDAD"), t("TIPO CAMA"), t("UPC"), t("PATOLOGIA")]
}

fn row(rut: &str, name: &str, bed: &str, upc: &str, diag: &str) -> Vec<Cell> {
	vec![t(rut), t(name), Cell::Number(58.0), t(bed), t(upc), t(diag)]
}

fn sheet(name: &str, rows: Vec<Vec<Cell>>) -> Sheet {
	Sheet { name: name.into(), rows }
}

fn nov(day: u32) -> NaiveDate {
	NaiveDate::from_ymd_opt(2025, 11, day).expect("valid test date")
}

// Three November days: Pérez spends two nights and is discharged on the 3rd,
// Soto arrives on the 2nd and is still in bed when the data ends.
fn census_workbook() -> Workbook {
	Workbook {
		sheets: vec![
			sheet(
				"01-11",
				vec![
					vec![t("CENSO DIARIO HOSPITAL")],
					header(),
					row("12.345.678-9", "PEREZ JUAN", "UCI", "SI", "NEUMONIA GRAVE"),
				],
			),
			sheet(
				"02-11",
				vec![
					header(),
					row("12.345.678-9", "PEREZ JUAN", "MEDIA", "", "NEUMONIA GRAVE"),
					row("7.654.321-0", "SOTO ANA", "MEDIA", "", "APENDICITIS"),
				],
			),
			sheet(
				"03-11",
				vec![
					header(),
					row("7.654.321-0", "SOTO ANA", "MEDIA", "", "APENDICITIS"),
					vec![t("ALTAS")],
					row("12.345.678-9", "PEREZ JUAN", "MEDIA", "", "NEUMONIA GRAVE"),
				],
			),
		],
	}
}

#[test]
fn workbook_to_report_round_trip() {
	let wb = census_workbook();
	let snapshots = extract_workbook(&wb, "11. NOVIEMBRE 2025.xlsx");
	assert_eq!(snapshots.len(), 5);
	assert_eq!(snapshots[0].date, nov(1));
	assert_eq!(snapshots[4].status, SnapshotStatus::Discharged);

	let events = reconcile(snapshots);
	assert_eq!(events.len(), 2);

	let perez = events.iter().find(|e| &*e.rut == "123456789").expect("perez event");
	assert_eq!(perez.first_seen, nov(1));
	assert_eq!(perez.discharge_date, Some(nov(3)));
	assert_eq!(perez.status, EventStatus::Discharged);
	assert_eq!(perez.los, 2);
	assert!(perez.was_ever_upc);
	assert!(!perez.is_upc);

	let soto = events.iter().find(|e| &*e.rut == "76543210").expect("soto event");
	assert_eq!(soto.status, EventStatus::Hospitalized);
	assert_eq!(soto.exit_date(), None);
	assert_eq!(soto.los, 1);

	let report = report_for_period(&events, "Noviembre 2025", nov(1), nov(30)).expect("report");
	assert_eq!(report.total_admissions, 2);
	assert_eq!(report.total_discharges, 1);
	assert_eq!(report.total_upc_patients, 1);
	assert_eq!(report.avg_los, 2.0);

	// the discharge day itself is not a bed day
	assert_eq!(report.daily[0].total_occupancy, 1);
	assert_eq!(report.daily[1].total_occupancy, 2);
	assert_eq!(report.daily[2].total_occupancy, 1);
	assert_eq!(report.daily[2].discharges, 1);
	// occupancy splits by the event's current UPC flag; Pérez left UPC after
	// the first day, so his bed days count as non-UPC even on Nov 1
	assert_eq!(report.daily[0].upc_occupancy, 0);
	assert_eq!(report.daily[0].non_upc_occupancy, 1);
	// Soto stays admitted through the end of the window
	assert_eq!(report.daily.len(), 30);
	let perez_copy = report
		.patients
		.iter()
		.find(|e| &*e.rut == "123456789")
		.expect("perez in report");
	assert_eq!(perez_copy.days_in_period, 2);

	let monthly = monthly_reports(&events);
	assert_eq!(monthly.len(), 1);
	assert_eq!(monthly[0].title, "Noviembre 2025");

	let mut buf = Vec::new();
	write_report_csv(&report, &mut buf).expect("csv export");
	let text = String::from_utf8(buf).expect("utf8 csv");
	assert_eq!(text.lines().count(), 3);
	assert!(text.lines().nth(0).expect("header line").starts_with("RUT,Nombre"));
	assert!(text.contains("PEREZ JUAN"));
	assert!(text.contains("03-11-2025"));
}
