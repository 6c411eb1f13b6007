//! Record-level formatting primitives shared by the reader and writer.

pub mod encoder;
pub mod row;

pub use encoder::{encode_row, escape_placeholder, field_needs_quotes, to_row, PLACEHOLDER};
pub use row::{header_index, normalize_row, read_header_map, Row};
