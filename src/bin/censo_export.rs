use std::error::Error;
use std::fs;
use std::path::Path;

use censo::ProgressSink;


fn main() -> Result<(), Box<dyn Error>> {
	let argv: Vec<String> = std::env::args().collect();
	if argv.len() < 3 {
		eprintln!("uso: {} <directorio-salida> <censo.xlsx> [mas archivos...]", argv[0]);
		std::process::exit(2);
	}
	let outdir = Path::new(&argv[1]);
	fs::create_dir_all(outdir)?;
	let files = &argv[2..];

	let mut snapshots = Vec::new();
	{
		let mut out = censo::default_output();
		for (i, name) in files.iter().enumerate() {
			out.file_started(i, files.len(), name);
			let bytes = match censo::slurp_magic(name) {
				Ok(b) => b,
				Err(e) => {
					eprintln!("{}: {}", name, e);
					continue
				},
			};
			match censo::parse_workbook(bytes, name) {
				Ok(mut v) => snapshots.append(&mut v),
				Err(e) => eprintln!("{}", e),
			}
		}
		out.finish();
	}

	let events = censo::reconcile(snapshots);
	for report in censo::monthly_reports(&events) {
		let path = outdir.join(format!("censo-{}.csv", report.start.format("%Y-%m")));
		let f = fs::File::create(&path)?;
		censo::write_report_csv(&report, f)?;
		println!("{} -> {}", report.title, path.display());
	}
	Ok(())
}
