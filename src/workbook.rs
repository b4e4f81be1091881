use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;
use log::warn;


/// One cell as the pipeline sees it. The census sheets only ever carry
/// numbers, text and dates; everything else degrades to `Empty`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
	Number(f64),
	Text(String),
	Date(NaiveDate),
	Empty,
}

impl Cell {
	fn from_data(d: &Data) -> Self {
		match d {
			Data::Int(v) => Self::Number(*v as f64),
			Data::Float(v) => Self::Number(*v),
			Data::String(s) => {
				if s.trim().is_empty() {
					Self::Empty
				} else {
					Self::Text(s.clone())
				}
			},
			Data::Bool(b) => Self::Text(String::from(if *b { "TRUE" } else { "FALSE" })),
			Data::DateTime(dt) => match dt.as_datetime() {
				Some(ndt) => Self::Date(ndt.date()),
				None => Self::Empty,
			},
			Data::DateTimeIso(s) => match s[..s.len().min(10)].parse::<NaiveDate>() {
				Ok(d) => Self::Date(d),
				Err(_) => Self::Text(s.clone()),
			},
			Data::DurationIso(s) => Self::Text(s.clone()),
			Data::Error(_) => Self::Empty,
			Data::Empty => Self::Empty,
		}
	}

	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}

	/// The cell rendered the way the census clerks see it. Whole numbers
	/// drop the decimal point so a numeric RUT cell reads back cleanly.
	pub fn display(&self) -> String {
		match self {
			Self::Number(v) => {
				if v.fract() == 0.0 && v.abs() < 1e15 {
					format!("{}", *v as i64)
				} else {
					format!("{}", v)
				}
			},
			Self::Text(s) => s.trim().to_string(),
			Self::Date(d) => d.format("%d-%m-%Y").to_string(),
			Self::Empty => String::new(),
		}
	}
}


#[derive(Debug, Clone)]
pub struct Sheet {
	pub name: String,
	pub rows: Vec<Vec<Cell>>,
}


#[derive(Debug, Clone)]
pub struct Workbook {
	pub sheets: Vec<Sheet>,
}

impl Workbook {
	/// Decode a whole spreadsheet from memory. Callers own the file I/O so
	/// batch ingestion can be parallelized and cancelled per file.
	pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, calamine::Error> {
		let mut wb = open_workbook_auto_from_rs(Cursor::new(bytes))?;
		let names = wb.sheet_names().to_vec();
		let mut sheets = Vec::with_capacity(names.len());
		for name in names {
			let range = match wb.worksheet_range(&name) {
				Ok(r) => r,
				Err(e) => {
					// chart sheets and other oddities are not census data
					warn!("hoja {:?} ilegible: {}", name, e);
					continue
				},
			};
			let rows = range
				.rows()
				.map(|row| row.iter().map(Cell::from_data).collect())
				.collect();
			sheets.push(Sheet { name, rows });
		}
		Ok(Self { sheets })
	}
}
