use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smartstring::alias::String as SmartString;
use unicode_normalization::UnicodeNormalization;


/// Which worksheet block a row was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotStatus {
	#[serde(rename = "hospitalizado")]
	Hospitalized,
	#[serde(rename = "alta")]
	Discharged,
	#[serde(rename = "traslado")]
	Transferred,
}

impl fmt::Display for SnapshotStatus {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Hospitalized => f.write_str("Hospitalizado"),
			Self::Discharged => f.write_str("Alta"),
			Self::Transferred => f.write_str("Traslado"),
		}
	}
}


/// Final state of a hospitalization event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
	#[serde(rename = "hospitalizado")]
	Hospitalized,
	#[serde(rename = "alta")]
	Discharged,
	#[serde(rename = "traslado")]
	Transferred,
	#[serde(rename = "desconocido")]
	Unknown,
}

impl fmt::Display for EventStatus {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Hospitalized => f.write_str("Hospitalizado"),
			Self::Discharged => f.write_str("Alta"),
			Self::Transferred => f.write_str("Traslado"),
			Self::Unknown => f.write_str("Desconocido"),
		}
	}
}


/// Normalized bed category. The worksheets write these in many spellings;
/// anything unrecognized is preserved verbatim in `Otra`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BedType {
	Media,
	Uti,
	Uci,
	Upc,
	Cma,
	Pensionado,
	Cirugia,
	Maternidad,
	Pediatria,
	Indefinido,
	Otra(SmartString),
}

impl BedType {
	pub fn normalize(raw: &str) -> Self {
		let token = raw.trim().to_uppercase();
		if token.is_empty() {
			return Self::Indefinido
		}
		if token.contains("MAYOR AMBULATORIA") {
			return Self::Cma
		}
		// dotted spellings like C.M.A. collapse onto the plain token
		let undotted: String = token.chars().filter(|c| *c != '.').collect();
		match undotted.as_str() {
			"CMA" => Self::Cma,
			"MEDIA" | "MEDIO" | "CAMA MEDIA" => Self::Media,
			"UTI" => Self::Uti,
			"UCI" => Self::Uci,
			"UPC" => Self::Upc,
			"PENSIONADO" => Self::Pensionado,
			"CIRUGIA" | "CIRUGÍA" => Self::Cirugia,
			"MATERNIDAD" => Self::Maternidad,
			"PEDIATRIA" | "PEDIATRÍA" => Self::Pediatria,
			"INDEFINIDO" => Self::Indefinido,
			_ => Self::Otra(token.into()),
		}
	}
}

impl FromStr for BedType {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::normalize(s))
	}
}

impl fmt::Display for BedType {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Media => f.write_str("MEDIA"),
			Self::Uti => f.write_str("UTI"),
			Self::Uci => f.write_str("UCI"),
			Self::Upc => f.write_str("UPC"),
			Self::Cma => f.write_str("CMA"),
			Self::Pensionado => f.write_str("PENSIONADO"),
			Self::Cirugia => f.write_str("CIRUGIA"),
			Self::Maternidad => f.write_str("MATERNIDAD"),
			Self::Pediatria => f.write_str("PEDIATRIA"),
			Self::Indefinido => f.write_str("INDEFINIDO"),
			Self::Otra(v) => f.write_str(v),
		}
	}
}

impl Serialize for BedType {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where S: Serializer
	{
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for BedType {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where D: Deserializer<'de>
	{
		let s = String::deserialize(deserializer)?;
		Ok(Self::normalize(&s))
	}
}


/// Reduce a raw RUT cell to digits plus an optional verifier K, without
/// leading zeros. Placeholders like `SIN-RUT` come out empty and are thereby
/// treated as an unknown identifier.
pub fn clean_rut(raw: &str) -> SmartString {
	let mut out = SmartString::new();
	for c in raw.chars() {
		let c = match c {
			'0'..='9' => c,
			'K' | 'k' => 'K',
			_ => continue,
		};
		// leading zeros carry nothing
		if out.is_empty() && c == '0' {
			continue
		}
		out.push(c);
	}
	out
}

/// Canonical matching form of a patient name: uppercased, accents folded
/// away, anything that is not A-Z reduced to single spaces.
pub fn normalize_name(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	let mut pending_space = false;
	for c in raw.to_uppercase().nfd() {
		match c {
			'A'..='Z' => {
				if pending_space && !out.is_empty() {
					out.push(' ');
				}
				pending_space = false;
				out.push(c);
			},
			c if c.is_whitespace() => {
				pending_space = true;
			},
			// combining marks and punctuation carry no identity
			_ => (),
		}
	}
	out
}
