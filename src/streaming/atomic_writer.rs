//! Atomic file writer with automatic cleanup on failure.
//!
//! Writes to a temporary file in the same directory as the destination,
//! then atomically replaces the destination on `finish()`. If dropped
//! before finishing, the temporary file is automatically cleaned up and the
//! destination is left as it was.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// A buffered byte writer that only replaces its destination on success.
pub struct AtomicFileWriter {
    writer: BufWriter<NamedTempFile>,
    final_path: PathBuf,
}

impl AtomicFileWriter {
    /// Creates a new atomic writer targeting the specified path.
    ///
    /// The temporary file is created in the same directory as `final_path`
    /// to ensure atomic persistence (same filesystem requirement).
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the path has no file name or the temporary
    /// file cannot be created.
    pub fn new(final_path: impl AsRef<Path>) -> Result<Self> {
        let final_path = final_path.as_ref().to_path_buf();

        if final_path.file_name().is_none() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not a file path: {}", final_path.display()),
            )));
        }

        // A bare file name has an empty parent.
        let parent_dir = match final_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let temp_file = NamedTempFile::new_in(parent_dir)?;

        Ok(Self {
            writer: BufWriter::new(temp_file),
            final_path,
        })
    }

    /// Flushes all buffers and atomically persists the file to the final path.
    ///
    /// Returns the final path on success. On error, the temporary file is
    /// cleaned up automatically.
    pub fn finish(self) -> Result<PathBuf> {
        let named_temp = self.writer.into_inner().map_err(|e| e.into_error())?;

        named_temp
            .persist(&self.final_path)
            .map_err(|e| Error::Io(e.error))?;

        tracing::debug!(path = %self.final_path.display(), "Persisted output file");
        Ok(self.final_path)
    }
}

impl Write for AtomicFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
