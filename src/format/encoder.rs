//! Field encoding for delimited output.
//!
//! Two encodings exist. Quoted encoding follows the usual CSV rules: a field
//! is wrapped in `"` when it would otherwise be ambiguous, and embedded quotes
//! are doubled. Placeholder encoding is used by unquoted modes (typically TSV
//! and PSV): separators and line breaks inside a field are replaced with
//! U+FFFD. Placeholder encoding is lossy and only applies when quoting is off.

use crate::config::LineTerminator;

/// Character substituted for separators and line breaks in unquoted output.
pub const PLACEHOLDER: char = '\u{FFFD}';

/// Returns true if `field` has to be quoted when written with `sep`.
///
/// Empty fields are never quoted. The literal `\.` is quoted because some
/// bulk loaders treat it as an end-of-data marker.
pub fn field_needs_quotes(field: &str, sep: char) -> bool {
    if field.is_empty() {
        return false;
    }
    if field == r"\." || field.contains(sep) || field.contains(['"', '\r', '\n']) {
        return true;
    }

    field.chars().next().is_some_and(char::is_whitespace)
}

/// Encodes one record with quoting, without the trailing terminator.
///
/// Inside quoted fields `\n` is written as the terminator's newline and a
/// bare `\r` is kept only for LF output.
pub fn encode_row<S: AsRef<str>>(fields: &[S], sep: char, terminator: LineTerminator) -> String {
    let mut out = String::with_capacity(fields.iter().map(|f| f.as_ref().len() + 1).sum());
    encode_row_into(fields, sep, terminator, &mut out);
    out
}

/// Same as [`encode_row`], appending to `out`.
pub fn encode_row_into<S: AsRef<str>>(
    fields: &[S],
    sep: char,
    terminator: LineTerminator,
    out: &mut String,
) {
    for (i, field) in fields.iter().enumerate() {
        let field = field.as_ref();
        if i > 0 {
            out.push(sep);
        }

        if !field_needs_quotes(field, sep) {
            out.push_str(field);
            continue;
        }

        out.push('"');
        for c in field.chars() {
            match c {
                '"' => out.push_str("\"\""),
                '\r' => {
                    if terminator == LineTerminator::Lf {
                        out.push('\r');
                    }
                }
                '\n' => out.push_str(terminator.as_str()),
                _ => out.push(c),
            }
        }
        out.push('"');
    }
}

/// Encodes a comma-separated, LF-convention row. Convenience for callers
/// building single lines of CSV text.
pub fn to_row<S: AsRef<str>>(fields: &[S]) -> String {
    encode_row(fields, ',', LineTerminator::Lf)
}

/// Replaces separators and line breaks with [`PLACEHOLDER`].
pub fn escape_placeholder<S: AsRef<str>>(fields: &[S], sep: char) -> Vec<String> {
    fields
        .iter()
        .map(|field| {
            field
                .as_ref()
                .chars()
                .map(|c| {
                    if c == sep || c == '\n' || c == '\r' {
                        PLACEHOLDER
                    } else {
                        c
                    }
                })
                .collect()
        })
        .collect()
}
