//! Streaming writer for delimited output.
//!
//! Rows arrive on a channel and are encoded on a blocking thread. A file
//! destination is only replaced once every row has been written; a byte
//! sink receives rows as they are encoded.

use std::io::{BufWriter, Write};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::atomic_writer::AtomicFileWriter;
use super::ROW_BUFFER;
use crate::config::{validate_separator, Config, LineTerminator, SinkHandle, Target};
use crate::error::{Error, Result};
use crate::format::encoder::{encode_row_into, escape_placeholder};
use crate::format::Row;

/// Writes rows to the destination a [`Config`] points to.
#[derive(Debug, Clone)]
pub struct DelimitedWriter {
    cfg: Config,
}

impl DelimitedWriter {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Writes the header line (when headers are set) followed by every row
    /// received from `rx`, until `rx` is closed.
    ///
    /// If writing fails or `cancel` fires, the rest of `rx` is drained so that
    /// producers blocked on it can finish. A file destination is left
    /// untouched in that case.
    ///
    /// # Errors
    ///
    /// - `Cancelled` if `cancel` fires before the channel is closed.
    /// - `Io` if the destination cannot be created or written.
    pub async fn write_stream(
        &self,
        cancel: &CancellationToken,
        mut rx: mpsc::Receiver<Row>,
    ) -> Result<()> {
        let (line_tx, line_rx) = mpsc::channel::<Row>(ROW_BUFFER);
        let cfg = self.cfg.clone();
        let sink_cancel = cancel.clone();
        let sink = tokio::task::spawn_blocking(move || write_rows(&cfg, &sink_cancel, line_rx));

        let mut forwarded = Ok(());
        loop {
            let row = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    forwarded = Err(Error::Cancelled);
                    break;
                }
                row = rx.recv() => row,
            };

            let Some(row) = row else {
                break;
            };

            // A closed line channel means the sink task failed; its error is
            // collected below.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    forwarded = Err(Error::Cancelled);
                    break;
                }
                sent = line_tx.send(row) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        drop(line_tx);

        // Producers are released before waiting on a sink that may be stuck
        // in a write.
        let drained = if forwarded.is_err() {
            Some(drain(&mut rx).await)
        } else {
            None
        };

        let written = match sink.await {
            Ok(result) => result,
            Err(e) => Err(Error::Internal(format!("Writer task join error: {}", e))),
        };

        let result = forwarded.and(written);
        if let Err(e) = &result {
            let drained = match drained {
                Some(n) => n,
                None => drain(&mut rx).await,
            };
            tracing::warn!(error = %e, drained, "Writing stopped, input drained");
        }
        result
    }
}

/// Receives and discards the remaining rows until the channel closes.
async fn drain(rx: &mut mpsc::Receiver<Row>) -> usize {
    let mut drained = 0usize;
    while rx.recv().await.is_some() {
        drained += 1;
    }
    drained
}

/// Blocking half of [`DelimitedWriter::write_stream`].
fn write_rows(cfg: &Config, cancel: &CancellationToken, mut rx: mpsc::Receiver<Row>) -> Result<()> {
    let encoder = RowEncoder::from_config(cfg)?;
    let mut output = RowOutput::open(&cfg.target)?;
    let mut line = String::new();

    if !cfg.headers.is_empty() {
        encoder.encode(&cfg.headers, &mut line);
        output.write_all(line.as_bytes())?;
    }

    let mut count = 0usize;
    while let Some(row) = rx.blocking_recv() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        line.clear();
        encoder.encode(&row, &mut line);
        output.write_all(line.as_bytes())?;

        count += 1;
        if count % super::PROGRESS_EVERY == 0 {
            tracing::debug!(rows = count, "Wrote rows");
        }
    }

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    output.finish()?;
    tracing::debug!(rows = count, "Finished writing rows");
    Ok(())
}

/// Turns rows into terminated output lines.
struct RowEncoder {
    sep: char,
    quoting: bool,
    terminator: LineTerminator,
}

impl RowEncoder {
    fn from_config(cfg: &Config) -> Result<Self> {
        validate_separator(cfg.col_sep)?;
        Ok(Self {
            sep: cfg.col_sep,
            quoting: cfg.quoting(),
            terminator: cfg.terminator,
        })
    }

    fn encode(&self, fields: &[String], out: &mut String) {
        if self.quoting {
            encode_row_into(fields, self.sep, self.terminator, out);
        } else {
            let escaped = escape_placeholder(fields, self.sep);
            for (i, field) in escaped.iter().enumerate() {
                if i > 0 {
                    out.push(self.sep);
                }
                out.push_str(field);
            }
        }
        out.push_str(self.terminator.as_str());
    }
}

enum RowOutput {
    File(AtomicFileWriter),
    Sink(BufWriter<SinkHandle>),
}

impl RowOutput {
    fn open(target: &Target) -> Result<Self> {
        match target {
            Target::Path(path) => Ok(RowOutput::File(AtomicFileWriter::new(path)?)),
            Target::Sink(sink) => Ok(RowOutput::Sink(BufWriter::new(sink.clone()))),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        match self {
            RowOutput::File(writer) => writer.write_all(buf)?,
            RowOutput::Sink(writer) => writer.write_all(buf)?,
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        match self {
            RowOutput::File(writer) => {
                writer.finish()?;
            }
            RowOutput::Sink(mut writer) => writer.flush()?,
        }
        Ok(())
    }
}
