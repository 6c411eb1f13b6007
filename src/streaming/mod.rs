//! Streaming readers and writers for delimited files.
//!
//! Blocking parse and encode work runs on `spawn_blocking` threads and is
//! connected to callers through bounded `tokio::sync::mpsc` channels. Every
//! streaming operation takes a `CancellationToken` and stops at the next row
//! boundary once it fires.

mod atomic_writer;
mod chunked;
mod reader;
mod writer;

pub use atomic_writer::AtomicFileWriter;
pub use reader::DelimitedReader;
pub use writer::DelimitedWriter;

/// Capacity of the internal channels between pipeline stages.
pub(crate) const ROW_BUFFER: usize = 256;

/// Progress is logged every this many rows.
pub(crate) const PROGRESS_EVERY: usize = 100_000;
