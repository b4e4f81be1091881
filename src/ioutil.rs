use std::fs;
use std::io;
use std::io::Read;
use std::path::Path;

use flate2;


/// Slurp a census file into memory, transparently gunzipping `.gz`. The
/// workbook decoder seeks, so it needs the whole buffer anyway.
pub fn slurp_magic<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
	let path = path.as_ref();
	let mut buf = Vec::new();
	match path.extension() {
		Some(x) if x == "gz" => {
			flate2::read::GzDecoder::new(fs::File::open(path)?).read_to_end(&mut buf)?;
		},
		_ => {
			fs::File::open(path)?.read_to_end(&mut buf)?;
		},
	}
	Ok(buf)
}
