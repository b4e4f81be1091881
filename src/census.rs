use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, Duration, Local, NaiveDate};
use enum_map::{Enum, EnumMap};
use log::warn;
use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmartString;

use crate::context::{clean_rut, BedType, SnapshotStatus};
use crate::workbook::{Cell, Sheet, Workbook};


/// One patient-day observation, decoded from a single worksheet row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
	pub date: NaiveDate,
	pub rut: SmartString,
	pub name: String,
	pub age: Option<u32>,
	pub diagnosis: String,
	pub bed_type: BedType,
	pub is_upc: bool,
	pub status: SnapshotStatus,
	pub source_file: String,
}


#[derive(Debug)]
pub struct ParseError {
	pub file: String,
	pub cause: calamine::Error,
}

impl fmt::Display for ParseError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}: {}", self.file, self.cause)
	}
}

impl std::error::Error for ParseError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.cause)
	}
}


static MESES: [&str; 12] = [
	"ENERO",
	"FEBRERO",
	"MARZO",
	"ABRIL",
	"MAYO",
	"JUNIO",
	"JULIO",
	"AGOSTO",
	"SEPTIEMBRE",
	"OCTUBRE",
	"NOVIEMBRE",
	"DICIEMBRE",
];

fn month_in(upper: &str) -> Option<u32> {
	for (i, m) in MESES.iter().enumerate() {
		if upper.contains(m) {
			return Some(i as u32 + 1)
		}
	}
	// common Chilean spelling
	if upper.contains("SETIEMBRE") {
		return Some(9)
	}
	None
}

fn scan_year(upper: &str) -> Option<i32> {
	let chars: Vec<char> = upper.chars().collect();
	for w in chars.windows(4) {
		if w[0] == '2' && w[1] == '0' && w[2].is_ascii_digit() && w[3].is_ascii_digit() {
			let tens = w[2].to_digit(10)?;
			let ones = w[3].to_digit(10)?;
			return Some(2000 + (tens * 10 + ones) as i32)
		}
	}
	None
}


/// Year and (maybe) month a workbook covers, voted from the filename and the
/// sheet tab names. Needed to break the day-month / month-day ambiguity of
/// tabs like `01-11` or `1.11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkbookContext {
	pub year: i32,
	pub month: Option<u32>,
}

impl WorkbookContext {
	pub fn resolve<'x, I: IntoIterator<Item = &'x str>>(filename: &str, sheet_names: I) -> Self {
		let upper = filename.to_uppercase();
		let fname_month = month_in(&upper);
		let fname_year = scan_year(&upper);

		let mut year_votes: HashMap<i32, usize> = HashMap::new();
		let mut month_votes: HashMap<u32, usize> = HashMap::new();
		for name in sheet_names {
			if let Some((_, p2, Some(p3))) = date_groups(name) {
				let y = if p3 < 100 { p3 + 2000 } else { p3 };
				*year_votes.entry(y as i32).or_insert(0) += 1;
				if p2 >= 1 && p2 <= 12 {
					*month_votes.entry(p2).or_insert(0) += 1;
				}
			}
		}

		let year = year_votes
			.iter()
			.max_by_key(|(y, c)| (**c, **y))
			.map(|(y, _)| *y)
			.or(fname_year)
			.unwrap_or_else(|| Local::now().date_naive().year());
		let month = fname_month.or_else(|| {
			month_votes
				.iter()
				.max_by_key(|(m, c)| (**c, **m))
				.map(|(m, _)| *m)
		});
		Self { year, month }
	}
}


// Digit runs of a sheet name plus, per gap between consecutive runs, whether
// that gap consists only of date separators (whitespace, dot, dash, slash).
fn scan_runs(s: &str) -> (Vec<(u64, usize)>, Vec<bool>) {
	let mut runs: Vec<(u64, usize)> = Vec::new();
	let mut gaps: Vec<bool> = Vec::new();
	let mut cur: Option<(u64, usize)> = None;
	let mut gap_ok = true;
	let mut gap_len = 0usize;
	for c in s.chars() {
		if let Some(d) = c.to_digit(10) {
			match cur.as_mut() {
				Some((v, l)) => {
					*v = v.saturating_mul(10).saturating_add(d as u64);
					*l += 1;
				},
				None => {
					if !runs.is_empty() {
						gaps.push(gap_ok && gap_len > 0);
					}
					cur = Some((d as u64, 1));
				},
			}
		} else {
			if let Some(run) = cur.take() {
				runs.push(run);
				gap_ok = true;
				gap_len = 0;
			}
			gap_len += 1;
			if !(c.is_whitespace() || c == '.' || c == '-' || c == '/') {
				gap_ok = false;
			}
		}
	}
	if let Some(run) = cur.take() {
		runs.push(run);
	}
	(runs, gaps)
}

// Up to three numeric date groups. The first group may be the tail of a
// longer run (a tab like `2025-11-01` yields 25/11/01), the second must be a
// standalone one- or two-digit run, the third needs at least two digits.
fn date_groups(s: &str) -> Option<(u32, u32, Option<u32>)> {
	let (runs, gaps) = scan_runs(s);
	for i in 0..runs.len() {
		if i + 1 >= runs.len() || !gaps[i] {
			continue
		}
		if runs[i + 1].1 > 2 {
			continue
		}
		let p1 = (runs[i].0 % 100) as u32;
		let p2 = runs[i + 1].0 as u32;
		let p3 = match runs.get(i + 2) {
			Some(&(v, l)) if gaps[i + 1] && l >= 2 && l <= 9 => {
				if l > 4 {
					Some((v / 10u64.pow((l - 4) as u32)) as u32)
				} else {
					Some(v as u32)
				}
			},
			_ => None,
		};
		return Some((p1, p2, p3))
	}
	None
}


/// Parse a day-month-ish string against the workbook context. When the
/// context knows the month, a tab written month-first (`11-04` in November)
/// is recognized and flipped; otherwise day-month is assumed. Dates that do
/// not exist (a rolled-over `30-02`) come back as `None`.
pub fn parse_date_str(s: &str, ctx: &WorkbookContext) -> Option<NaiveDate> {
	let (p1, p2, p3) = date_groups(s)?;
	let year = match p3 {
		Some(y) if y < 100 => (y + 2000) as i32,
		Some(y) => y as i32,
		None => ctx.year,
	};
	let (day, month) = match ctx.month {
		Some(m) if p2 == m => (p1, p2),
		Some(m) if p1 == m => (p2, p1),
		_ => (p1, p2),
	};
	NaiveDate::from_ymd_opt(year, month, day)
}

/// Date from an arbitrary cell: spreadsheet serials, native dates, or the
/// string form handled by [`parse_date_str`].
pub fn parse_date_value(cell: &Cell, ctx: &WorkbookContext) -> Option<NaiveDate> {
	match cell {
		Cell::Number(v) => {
			if *v < 1.0 || *v > 120000.0 {
				return None
			}
			// serial day count since 1899-12-30; 25569 is the Unix epoch
			let days = (*v - 25569.0).floor() as i64;
			Some(NaiveDate::from_ymd_opt(1970, 1, 1)? + Duration::days(days))
		},
		Cell::Date(d) => Some(*d),
		Cell::Text(s) => parse_date_str(s, ctx),
		Cell::Empty => None,
	}
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
enum Column {
	Rut,
	Name,
	Age,
	BedType,
	Upc,
	Diagnosis,
}

type ColumnMap = EnumMap<Column, Option<usize>>;

fn recognize_columns(row: &[Cell]) -> ColumnMap {
	let mut map = ColumnMap::default();
	for (i, cell) in row.iter().enumerate() {
		let label = cell.display().to_uppercase();
		if label.is_empty() {
			continue
		}
		let col = if label.contains("RUT") {
			Column::Rut
		} else if label.contains("PACIENTE") || label.contains("NOMBRE") {
			Column::Name
		} else if label.contains("EDAD") {
			Column::Age
		} else if label.contains("TIPO") {
			Column::BedType
		} else if label.contains("UPC") {
			Column::Upc
		} else if label.contains("PATOLOG")
			|| label.contains("DIAGNOST")
			|| label.contains("DIAGNÓST")
			|| label == "DIAG"
			|| label == "DIAG."
			|| label == "DG"
		{
			Column::Diagnosis
		} else {
			continue
		};
		if map[col].is_none() {
			map[col] = Some(i);
		}
	}
	map
}

fn is_header(joined: &str) -> bool {
	let name_tok = joined.contains("PACIENTE") || joined.contains("NOMBRE");
	// same diagnosis synonyms the column map recognizes; DG only as a word
	let diag_tok = joined.contains("PATOLOG")
		|| joined.contains("DIAG")
		|| joined.split(' ').any(|t| t == "DG");
	(joined.contains("RUT") && (name_tok || diag_tok)) || (joined.contains("CAMA") && name_tok)
}

fn join_upper(row: &[Cell]) -> String {
	let mut out = String::new();
	for c in row.iter() {
		let t = c.display();
		if t.is_empty() {
			continue
		}
		if !out.is_empty() {
			out.push(' ');
		}
		out.push_str(&t);
	}
	out.to_uppercase()
}

fn parse_upc_flag(raw: &str) -> bool {
	let t = raw.trim().to_uppercase();
	t == "SI" || t == "X" || t.contains("UPC") || t.contains("UCI") || t.contains("UTI")
}

fn parse_age(cell: &Cell) -> Option<u32> {
	match cell {
		Cell::Number(v) if *v >= 0.0 && *v < 150.0 => Some(*v as u32),
		Cell::Text(s) => {
			let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
			match digits.parse::<u32>() {
				Ok(v) if v < 150 => Some(v),
				_ => None,
			}
		},
		_ => None,
	}
}


fn decode_sheet(sheet: &Sheet, date: NaiveDate, source: &str, out: &mut Vec<Snapshot>) {
	let mut block = SnapshotStatus::Hospitalized;
	let mut columns: Option<ColumnMap> = None;

	for row in sheet.rows.iter() {
		let joined = join_upper(row);

		// sub-block markers are short banner rows between the tables
		if joined.len() < 200 {
			if joined.contains("ALTAS") && !joined.contains("NO") {
				block = SnapshotStatus::Discharged;
				continue
			}
			if joined.contains("TRASLAD") || joined.contains("DERIVADO") {
				block = SnapshotStatus::Transferred;
				continue
			}
		}

		let cols = match columns {
			Some(ref c) => c,
			None => {
				if is_header(&joined) {
					columns = Some(recognize_columns(row));
					block = SnapshotStatus::Hospitalized;
				}
				continue
			},
		};

		// effective width the way a ragged spreadsheet row reports it
		let row_len = match row.iter().rposition(|c| !c.is_empty()) {
			Some(i) => i + 1,
			None => 0,
		};
		if row_len <= 2 {
			continue
		}

		let cell_text = |col: Column| -> String {
			cols[col]
				.and_then(|i| row.get(i))
				.map(|c| c.display())
				.unwrap_or_default()
		};

		let raw_name = cell_text(Column::Name);
		let raw_id = cell_text(Column::Rut);
		let diagnosis = cell_text(Column::Diagnosis);
		let uname = raw_name.to_uppercase();
		let uid = raw_id.to_uppercase();

		// repeated header rows deeper in the sheet
		if uname == "NOMBRE" || uname == "PACIENTE" || uid == "RUT" || uid == "RUN" {
			continue
		}
		// blocked beds and decorative section rows are not patients
		if uname.starts_with("BLOQUEO")
			|| uname.contains("AISLAMIENTO")
			|| uname.contains("SERVICIO DE")
			|| uname.contains("UNIDAD DE")
			|| uname == "CAMA"
			|| uname == "TIPO DE CAMA"
		{
			continue
		}
		if raw_name.is_empty() {
			continue
		}

		let rut = clean_rut(&raw_id);
		if rut.is_empty() && diagnosis.is_empty() {
			continue
		}

		let age = cols[Column::Age].and_then(|i| row.get(i)).and_then(parse_age);
		let bed_type = BedType::normalize(&cell_text(Column::BedType));
		let is_upc = parse_upc_flag(&cell_text(Column::Upc));

		out.push(Snapshot {
			date,
			rut,
			name: raw_name,
			age,
			diagnosis,
			bed_type,
			is_upc,
			status: block,
			source_file: source.to_string(),
		});
	}
}


/// Decode an already-loaded workbook into snapshots, sheet by sheet in
/// ascending day order. Sheets without a recognizable date are skipped.
pub fn extract_workbook(wb: &Workbook, filename: &str) -> Vec<Snapshot> {
	let ctx = WorkbookContext::resolve(filename, wb.sheets.iter().map(|s| s.name.as_str()));
	let mut dated: Vec<(NaiveDate, &Sheet)> = Vec::new();
	for sheet in wb.sheets.iter() {
		match parse_date_str(&sheet.name, &ctx) {
			Some(d) => dated.push((d, sheet)),
			None => warn!("{}: hoja {:?} sin fecha reconocible, omitida", filename, sheet.name),
		}
	}
	dated.sort_by_key(|(d, _)| *d);

	let mut out = Vec::new();
	for (date, sheet) in dated {
		decode_sheet(sheet, date, filename, &mut out);
	}
	out
}

/// Decode a workbook from raw bytes. An unreadable workbook is fatal for
/// this file only; a readable workbook with no census rows yields an empty
/// vector.
pub fn parse_workbook(bytes: Vec<u8>, filename: &str) -> Result<Vec<Snapshot>, ParseError> {
	let wb = Workbook::from_bytes(bytes).map_err(|cause| ParseError {
		file: filename.to_string(),
		cause,
	})?;
	Ok(extract_workbook(&wb, filename))
}
