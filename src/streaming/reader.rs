//! Row reader for delimited files.
//!
//! Parsing is done by the `csv` crate in flexible mode so that row shape is
//! decided by the configured [`BadRowMode`], not by the parser. Quoting is
//! honoured only when the config asks for it; otherwise quotes are literal.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use csv::{ByteRecord, ReaderBuilder};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{PROGRESS_EVERY, ROW_BUFFER};
use crate::config::{validate_separator, BadRowMode, Config};
use crate::error::{Error, Result};
use crate::format::{header_index, normalize_row, Row};

const BOM: char = '\u{FEFF}';

/// Reads rows from the file a [`Config`] points to.
#[derive(Debug, Clone)]
pub struct DelimitedReader {
    cfg: Config,
    header_map: HashMap<String, usize>,
}

impl DelimitedReader {
    pub fn new(cfg: Config) -> Self {
        let header_map = header_index(&cfg.headers);
        Self { cfg, header_map }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Headers detected in the file or given explicitly.
    pub fn headers(&self) -> &[String] {
        &self.cfg.headers
    }

    /// Returns the value of the column named `name` (case-insensitive).
    ///
    /// Returns `None` and logs a warning if the name is unknown or the row
    /// is too short to contain that column.
    pub fn field<'r>(&self, row: &'r [String], name: &str) -> Option<&'r str> {
        let Some(&idx) = self.header_map.get(&name.to_lowercase()) else {
            tracing::warn!(field = name, "Unknown field name");
            return None;
        };

        let value = row.get(idx).map(String::as_str);
        if value.is_none() {
            tracing::warn!(
                field = name,
                index = idx,
                row_fields_num = row.len(),
                "Row is too short for field"
            );
        }
        value
    }

    /// Reads a window of rows.
    ///
    /// The first `offset` data rows are skipped without shape validation, then
    /// up to `limit` rows are collected (`limit == 0` reads to the end).
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` on the first malformed row under
    /// `BadRowMode::Error`, and I/O or parse errors from the source.
    pub fn read_slice(&self, offset: usize, limit: usize) -> Result<Vec<Row>> {
        let (mut source, mut policy) = open_rows(&self.cfg)?;

        let mut rows = Vec::new();
        let mut seen = 0usize;

        while limit == 0 || rows.len() < limit {
            let Some((line, row)) = source.next_row()? else {
                break;
            };

            seen += 1;
            if seen <= offset {
                policy.establish(row.len());
                continue;
            }

            if let Some(row) = policy.apply(line, row)? {
                rows.push(row);
            }
        }

        Ok(rows)
    }

    /// Streams every row to `tx` in source order and returns the number of
    /// rows delivered.
    ///
    /// Parsing runs on a blocking thread; this future forwards its rows and
    /// stops as soon as `cancel` fires, even while a send is pending.
    ///
    /// # Errors
    ///
    /// - `Cancelled` if `cancel` fires before the end of the file.
    /// - `ChannelClosed` if the receiver of `tx` is dropped.
    /// - `ShapeMismatch` on a malformed row under `BadRowMode::Error`.
    pub async fn read(&self, cancel: &CancellationToken, tx: &mpsc::Sender<Row>) -> Result<usize> {
        let (row_tx, mut row_rx) = mpsc::channel::<Result<Row>>(ROW_BUFFER);
        let cfg = self.cfg.clone();
        let producer_cancel = cancel.clone();
        let producer =
            tokio::task::spawn_blocking(move || produce_rows(&cfg, &producer_cancel, &row_tx));

        let mut count = 0usize;
        let result = loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(Error::Cancelled),
                item = row_rx.recv() => item,
            };

            let row = match item {
                Some(Ok(row)) => row,
                Some(Err(e)) => break Err(e),
                None => break Ok(count),
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(Error::Cancelled),
                sent = tx.send(row) => {
                    if sent.is_err() {
                        break Err(Error::ChannelClosed);
                    }
                }
            }

            count += 1;
            if count % PROGRESS_EVERY == 0 {
                tracing::debug!(rows = count, "Read file lines");
            }
        };

        // Unblocks a producer waiting on a full buffer so the file gets closed.
        drop(row_rx);
        let joined = producer
            .await
            .map_err(|e| Error::Internal(format!("Reader task join error: {}", e)));

        match result {
            Ok(count) => {
                joined?;
                tracing::debug!(rows = count, "Finished reading rows");
                Ok(count)
            }
            Err(e) => Err(e),
        }
    }
}

/// Blocking half of [`DelimitedReader::read`].
fn produce_rows(cfg: &Config, cancel: &CancellationToken, tx: &mpsc::Sender<Result<Row>>) {
    let scanned = scan_rows(cfg, cancel, |row| tx.blocking_send(Ok(row)).is_ok());
    if let Err(e) = scanned {
        let _ = tx.blocking_send(Err(e));
    }
}

/// Feeds accepted rows to `emit` until the file ends, `emit` returns false,
/// or `cancel` fires.
fn scan_rows(
    cfg: &Config,
    cancel: &CancellationToken,
    mut emit: impl FnMut(Row) -> bool,
) -> Result<()> {
    let (mut source, mut policy) = open_rows(cfg)?;

    while let Some((line, row)) = source.next_row()? {
        if cancel.is_cancelled() {
            return Ok(());
        }
        if let Some(row) = policy.apply(line, row)? {
            if !emit(row) {
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Opens the source, consumes the header row if configured, and sets up the
/// shape policy.
///
/// A consumed header row sets the expected field count unless the config
/// carries a count that differs from its headers.
fn open_rows(cfg: &Config) -> Result<(RowSource, ShapePolicy)> {
    let mut source = RowSource::open(cfg)?;

    let mut expected = cfg.fields_num;
    if cfg.skip_headers {
        if let Some((_, header)) = source.next_row()? {
            if expected == 0 || expected == cfg.headers.len() {
                expected = header.len();
            }
        }
    }

    Ok((source, ShapePolicy::new(expected, cfg.bad_row_mode)))
}

/// Physical rows of a delimited file, with their line numbers.
///
/// Fields are decoded lossily: invalid UTF-8 becomes U+FFFD.
struct RowSource {
    reader: csv::Reader<BufReader<File>>,
    record: ByteRecord,
    first: bool,
}

impl RowSource {
    fn open(cfg: &Config) -> Result<Self> {
        let path = cfg.path().ok_or(Error::NoInputOrOutput)?;
        let delimiter = validate_separator(cfg.col_sep)?;
        let file = File::open(path)?;

        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .quoting(cfg.quoting())
            .from_reader(BufReader::new(file));

        Ok(Self {
            reader,
            record: ByteRecord::new(),
            first: true,
        })
    }

    fn next_row(&mut self) -> Result<Option<(u64, Row)>> {
        if !self.reader.read_byte_record(&mut self.record)? {
            return Ok(None);
        }
        let line = self.record.position().map_or(0, |pos| pos.line());

        let mut lossy = false;
        let mut row: Row = self
            .record
            .iter()
            .map(|field| match String::from_utf8_lossy(field) {
                Cow::Borrowed(s) => s.to_string(),
                Cow::Owned(s) => {
                    lossy = true;
                    s
                }
            })
            .collect();

        if std::mem::take(&mut self.first) {
            if let Some(field) = row.first_mut() {
                if let Some(stripped) = field.strip_prefix(BOM) {
                    *field = stripped.to_string();
                }
            }
        }

        if lossy {
            tracing::warn!(line, "Invalid UTF-8 replaced in row");
        }
        Ok(Some((line, row)))
    }
}

/// Applies a [`BadRowMode`] to rows whose field count is off.
struct ShapePolicy {
    fields_num: usize,
    mode: BadRowMode,
}

impl ShapePolicy {
    fn new(fields_num: usize, mode: BadRowMode) -> Self {
        Self { fields_num, mode }
    }

    /// Takes the expected field count from `row_fields_num` if none is set.
    fn establish(&mut self, row_fields_num: usize) {
        if self.fields_num == 0 {
            self.fields_num = row_fields_num;
        }
    }

    /// Returns the row to keep, `None` to skip it, or a shape error.
    fn apply(&mut self, line: u64, row: Row) -> Result<Option<Row>> {
        self.establish(row.len());
        let row_fields_num = row.len();
        if row_fields_num == self.fields_num {
            return Ok(Some(row));
        }

        match self.mode {
            BadRowMode::Error => {
                tracing::error!(
                    line,
                    fields_num = self.fields_num,
                    row_fields_num,
                    "Bad row"
                );
                Err(Error::ShapeMismatch {
                    line,
                    expected: self.fields_num,
                    found: row_fields_num,
                })
            }
            BadRowMode::Skip => {
                tracing::warn!(
                    line,
                    fields_num = self.fields_num,
                    row_fields_num,
                    "Wrong number of fields, SKIPPING row"
                );
                Ok(None)
            }
            BadRowMode::Process => {
                tracing::warn!(
                    line,
                    fields_num = self.fields_num,
                    row_fields_num,
                    "Wrong number of fields, PROCESSING the row anyway"
                );
                Ok(Some(normalize_row(row, self.fields_num)))
            }
        }
    }
}
