//! Row shape helpers and header lookups.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use csv::ReaderBuilder;

use crate::config::validate_separator;
use crate::error::Result;

/// A single delimited record.
pub type Row = Vec<String>;

/// Pads `row` with empty strings or truncates it so it has exactly
/// `fields_num` fields.
pub fn normalize_row(mut row: Row, fields_num: usize) -> Row {
    row.resize(fields_num, String::new());
    row
}

/// Builds a map from lower-cased header name to column index.
///
/// When a name repeats, the last column wins.
pub fn header_index<S: AsRef<str>>(headers: &[S]) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_ref().to_lowercase(), i))
        .collect()
}

/// Reads only the first row of `path` and maps each header name, as
/// written, to its column index.
///
/// Quotes are honoured, so a quoted header containing `sep` stays one name.
/// An empty file yields an empty map.
pub fn read_header_map(path: impl AsRef<Path>, sep: char) -> Result<HashMap<String, usize>> {
    let delimiter = validate_separator(sep)?;
    let file = File::open(path.as_ref())?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(BufReader::new(file));

    let mut record = csv::ByteRecord::new();
    if !reader.read_byte_record(&mut record)? {
        return Ok(HashMap::new());
    }

    Ok(record
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let name = String::from_utf8_lossy(name);
            (name.trim_start_matches('\u{FEFF}').to_string(), i)
        })
        .collect())
}
