//! Streaming reader and writer for delimited text files (CSV, TSV, PSV).
//!
//! A [`Config`] is resolved once, either from explicit options or by probing
//! the first line of a file for its separator and headers. From it a
//! [`DelimitedReader`] reads rows as a slice, as a row stream or as a chunk
//! stream, and a [`DelimitedWriter`] writes a row stream back out.
//!
//! Rows are plain `Vec<String>`; malformed rows are handled according to the
//! config's [`BadRowMode`].

pub mod config;
pub mod error;
pub mod format;
pub mod streaming;

#[cfg(test)]
mod test_support;

pub use config::{BadRowMode, Config, ConfigBuilder, LineTerminator, SinkHandle, Target};
pub use error::{Error, ErrorCategory, Result};
pub use format::Row;
pub use streaming::{AtomicFileWriter, DelimitedReader, DelimitedWriter};
pub use tokio_util::sync::CancellationToken;
