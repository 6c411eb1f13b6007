//! First-line probing used to resolve a configuration from a file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Separators considered by [`detect_delimiter`], in tie-break order.
pub const CANDIDATE_SEPARATORS: [char; 3] = [',', '\t', '|'];

/// Returns true if `path` points to an existing regular file.
pub fn file_exists(path: &Path) -> bool {
    matches!(std::fs::metadata(path), Ok(meta) if meta.is_file())
}

/// Reads the first line of `path` and closes the file.
///
/// The BOM and the line terminator are stripped and invalid UTF-8 is
/// replaced with U+FFFD. An empty file yields an empty string.
pub fn read_first_line(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;

    let line = line.strip_prefix(UTF8_BOM).unwrap_or(&line[..]);
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    Ok(String::from_utf8_lossy(line).into_owned())
}

/// Picks the candidate separator that occurs most often in `line`.
///
/// Ties go to the earlier entry of [`CANDIDATE_SEPARATORS`]
/// (comma, then tab, then pipe). Returns `None` if no candidate occurs.
pub fn detect_delimiter(line: &str) -> Option<char> {
    let mut counts = [0usize; CANDIDATE_SEPARATORS.len()];
    for c in line.chars() {
        if let Some(i) = CANDIDATE_SEPARATORS.iter().position(|&sep| sep == c) {
            counts[i] += 1;
        }
    }

    let mut best: Option<(char, usize)> = None;
    for (sep, count) in CANDIDATE_SEPARATORS.iter().zip(counts) {
        if count > best.map_or(0, |(_, n)| n) {
            best = Some((*sep, count));
        }
    }
    best.map(|(sep, _)| sep)
}

/// Splits a header line on `sep` into field names.
///
/// With `quoting` the line is parsed as a CSV record, so a quoted name may
/// contain the separator. Without it the line is split on every separator
/// and surrounding quotes are trimmed from each name.
pub fn split_headers(line: &str, sep: u8, quoting: bool) -> Vec<String> {
    if quoting {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(sep)
            .from_reader(line.as_bytes());

        let mut record = ByteRecord::new();
        if let Ok(true) = reader.read_byte_record(&mut record) {
            return record
                .iter()
                .map(|name| String::from_utf8_lossy(name).into_owned())
                .collect();
        }
    }

    line.split(char::from(sep))
        .map(|name| name.trim_matches('"').to_string())
        .collect()
}
