use std::error::Error;

use censo::{ProgressSink, Report};


fn print_report(r: &Report) {
	println!();
	println!(
		"== {} ({} a {})",
		r.title,
		r.start.format("%d-%m-%Y"),
		r.end.format("%d-%m-%Y"),
	);
	let transfers: u64 = r.daily.iter().map(|d| d.transfers).sum();
	println!(
		"   ingresos: {}  altas: {}  traslados: {}",
		r.total_admissions, r.total_discharges, transfers,
	);
	println!(
		"   pacientes UPC: {}  estadía promedio: {} días",
		r.total_upc_patients, r.avg_los,
	);
	if let Some(peak) = r.daily.iter().max_by_key(|d| d.total_occupancy) {
		println!(
			"   ocupación máxima: {} camas ({})",
			peak.total_occupancy,
			peak.date.format("%d-%m-%Y"),
		);
	}
}

fn main() -> Result<(), Box<dyn Error>> {
	let argv: Vec<String> = std::env::args().collect();
	if argv.len() < 2 {
		eprintln!("uso: {} <censo.xlsx> [mas archivos...]", argv[0]);
		std::process::exit(2);
	}
	let files = &argv[1..];

	let mut snapshots = Vec::new();
	let mut failed = 0usize;
	{
		let mut out = censo::default_output();
		for (i, name) in files.iter().enumerate() {
			out.file_started(i, files.len(), name);
			let bytes = match censo::slurp_magic(name) {
				Ok(b) => b,
				Err(e) => {
					eprintln!("{}: {}", name, e);
					failed += 1;
					continue
				},
			};
			match censo::parse_workbook(bytes, name) {
				Ok(mut v) => snapshots.append(&mut v),
				Err(e) => {
					eprintln!("{}", e);
					failed += 1;
				},
			}
		}
		out.finish();
	}
	println!(
		"{} observaciones en {} archivos ({} con errores)",
		snapshots.len(),
		files.len(),
		failed,
	);

	let events = censo::reconcile(snapshots);
	println!("{} hospitalizaciones reconstruidas", events.len());

	for report in censo::monthly_reports(&events) {
		print_report(&report);
	}
	Ok(())
}
