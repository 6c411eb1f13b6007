//! Resolution of delimited-file settings.
//!
//! A [`Config`] describes either a file to read from or a destination to
//! write to, together with its headers, column separator, expected field
//! count and bad-row policy. When reading, anything not given explicitly is
//! inferred from the first line of the file.

pub mod probe;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How to treat rows whose field count differs from the expected one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadRowMode {
    /// Stop reading and return an error.
    #[default]
    Error,
    /// Drop the row and continue.
    Skip,
    /// Pad or truncate the row to the expected size and keep it.
    Process,
}

impl BadRowMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BadRowMode::Error => "error",
            BadRowMode::Skip => "skip",
            BadRowMode::Process => "process",
        }
    }
}

impl fmt::Display for BadRowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadRowMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(BadRowMode::Error),
            "skip" => Ok(BadRowMode::Skip),
            "process" => Ok(BadRowMode::Process),
            _ => Err(Error::UnknownBadRowMode(s.to_string())),
        }
    }
}

/// Line ending written after each row and for newlines inside quoted fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    /// `\n`
    Lf,
    /// `\r\n`
    Crlf,
}

impl LineTerminator {
    pub fn as_str(self) -> &'static str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::Crlf => "\r\n",
        }
    }
}

impl Default for LineTerminator {
    /// The platform convention: CRLF on Windows, LF elsewhere.
    fn default() -> Self {
        if cfg!(windows) {
            LineTerminator::Crlf
        } else {
            LineTerminator::Lf
        }
    }
}

/// A caller-provided byte sink shared between copies of a [`Config`].
///
/// Only the writer's sink task ever writes to it.
#[derive(Clone)]
pub struct SinkHandle(Arc<Mutex<Box<dyn Write + Send>>>);

impl SinkHandle {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self(Arc::new(Mutex::new(Box::new(writer))))
    }
}

impl fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SinkHandle(..)")
    }
}

impl Write for SinkHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "sink lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "sink lock poisoned"))?
            .flush()
    }
}

/// Where rows come from or go to.
#[derive(Debug, Clone)]
pub enum Target {
    Path(PathBuf),
    Sink(SinkHandle),
}

/// Resolved, immutable settings for one delimited file or sink.
#[derive(Debug, Clone)]
pub struct Config {
    /// File to read from or write to, or a byte sink for output.
    pub target: Target,
    /// Field names, in column order.
    pub headers: Vec<String>,
    /// Consume the first physical line as the header row when reading.
    pub skip_headers: bool,
    /// Column separator.
    pub col_sep: char,
    /// Expected number of fields per row (0 means "take it from the first row").
    pub fields_num: usize,
    /// Policy for rows with a wrong number of fields.
    pub bad_row_mode: BadRowMode,
    /// Explicit quoting mode; `None` quotes exactly when `col_sep` is a comma.
    pub with_quotes: Option<bool>,
    /// Line ending for written rows.
    pub terminator: LineTerminator,
}

impl Config {
    /// Creates a builder with default options.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Returns the file path, if this config targets a file.
    pub fn path(&self) -> Option<&Path> {
        match &self.target {
            Target::Path(path) => Some(path),
            Target::Sink(_) => None,
        }
    }

    /// Whether fields are quoted (and quotes honoured) for this config.
    pub fn quoting(&self) -> bool {
        self.with_quotes.unwrap_or(self.col_sep == ',')
    }

    /// Returns a copy targeting `path`.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = Target::Path(path.into());
        self
    }

    /// Returns a copy writing to `writer`.
    pub fn with_writer<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.target = Target::Sink(SinkHandle::new(writer));
        self
    }

    /// Returns a copy with `headers`; the expected field count follows them.
    pub fn with_headers<S: Into<String>>(mut self, headers: impl IntoIterator<Item = S>) -> Self {
        self.headers = headers.into_iter().map(Into::into).collect();
        self.fields_num = self.headers.len();
        self
    }

    pub fn with_skip_headers(mut self, skip: bool) -> Self {
        self.skip_headers = skip;
        self
    }

    pub fn with_col_sep(mut self, sep: char) -> Self {
        self.col_sep = sep;
        self
    }

    pub fn with_fields_num(mut self, fields_num: usize) -> Self {
        self.fields_num = fields_num;
        self
    }

    pub fn with_bad_row_mode(mut self, mode: BadRowMode) -> Self {
        self.bad_row_mode = mode;
        self
    }

    pub fn with_quotes(mut self, quotes: bool) -> Self {
        self.with_quotes = Some(quotes);
        self
    }

    pub fn with_terminator(mut self, terminator: LineTerminator) -> Self {
        self.terminator = terminator;
        self
    }
}

/// Collects options and resolves them into a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    target: Option<Target>,
    headers: Vec<String>,
    skip_headers: Option<bool>,
    col_sep: Option<char>,
    fields_num: Option<usize>,
    bad_row_mode: BadRowMode,
    with_quotes: Option<bool>,
    terminator: LineTerminator,
}

impl ConfigBuilder {
    /// Sets the file to read from or write to. An empty path clears the target.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.target = if path.as_os_str().is_empty() {
            None
        } else {
            Some(Target::Path(path))
        };
        self
    }

    /// Sets a byte sink for output instead of a file.
    pub fn writer<W: Write + Send + 'static>(self, writer: W) -> Self {
        self.sink(SinkHandle::new(writer))
    }

    /// Sets an already shared byte sink for output.
    pub fn sink(mut self, sink: SinkHandle) -> Self {
        self.target = Some(Target::Sink(sink));
        self
    }

    pub fn headers<S: Into<String>>(mut self, headers: impl IntoIterator<Item = S>) -> Self {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn skip_headers(mut self, skip: bool) -> Self {
        self.skip_headers = Some(skip);
        self
    }

    pub fn col_sep(mut self, sep: char) -> Self {
        self.col_sep = Some(sep);
        self
    }

    /// Overrides the expected field count derived from the headers.
    pub fn fields_num(mut self, fields_num: usize) -> Self {
        self.fields_num = Some(fields_num);
        self
    }

    pub fn bad_row_mode(mut self, mode: BadRowMode) -> Self {
        self.bad_row_mode = mode;
        self
    }

    pub fn with_quotes(mut self, quotes: bool) -> Self {
        self.with_quotes = Some(quotes);
        self
    }

    pub fn terminator(mut self, terminator: LineTerminator) -> Self {
        self.terminator = terminator;
        self
    }

    /// Resolves the options into a [`Config`].
    ///
    /// For a file target without an explicit separator or headers, the first
    /// line of the file is read to detect them.
    ///
    /// # Errors
    ///
    /// - `NoInputOrOutput` if neither a path nor a writer was given.
    /// - `NoHeaders` for a writer target without headers.
    /// - `FileMissing` if the path does not exist.
    /// - `EmptyFirstLine` / `UndetectableDelimiter` if the probe fails.
    /// - `UnsupportedSeparator` for a non-ASCII or reserved separator.
    pub fn build(self) -> Result<Config> {
        if let Some(sep) = self.col_sep {
            validate_separator(sep)?;
        }

        let target = self.target.ok_or(Error::NoInputOrOutput)?;

        if let Some(col_sep) = self.col_sep {
            if !self.headers.is_empty() {
                let fields_num = self.fields_num.unwrap_or(self.headers.len());
                return Ok(Config {
                    target,
                    headers: self.headers,
                    skip_headers: self.skip_headers.unwrap_or(false),
                    col_sep,
                    fields_num,
                    bad_row_mode: self.bad_row_mode,
                    with_quotes: self.with_quotes,
                    terminator: self.terminator,
                });
            }
        }

        let path = match target {
            Target::Sink(sink) => {
                if self.headers.is_empty() {
                    return Err(Error::NoHeaders);
                }
                let fields_num = self.fields_num.unwrap_or(self.headers.len());
                return Ok(Config {
                    target: Target::Sink(sink),
                    headers: self.headers,
                    skip_headers: self.skip_headers.unwrap_or(false),
                    col_sep: self.col_sep.unwrap_or(','),
                    fields_num,
                    bad_row_mode: self.bad_row_mode,
                    with_quotes: self.with_quotes,
                    terminator: self.terminator,
                });
            }
            Target::Path(path) => path,
        };

        if !probe::file_exists(&path) {
            return Err(Error::FileMissing(path));
        }

        let first_line = probe::read_first_line(&path)?;
        if first_line.is_empty() {
            return Err(Error::EmptyFirstLine);
        }

        let col_sep = match self.col_sep {
            Some(sep) => sep,
            None => probe::detect_delimiter(&first_line).ok_or(Error::UndetectableDelimiter)?,
        };

        let (headers, skip_headers) = if self.headers.is_empty() {
            let delimiter = validate_separator(col_sep)?;
            let quoting = self.with_quotes.unwrap_or(col_sep == ',');
            (
                probe::split_headers(&first_line, delimiter, quoting),
                self.skip_headers.unwrap_or(true),
            )
        } else {
            (self.headers, self.skip_headers.unwrap_or(false))
        };

        let fields_num = self.fields_num.unwrap_or(headers.len());

        tracing::debug!(
            path = %path.display(),
            col_sep = ?col_sep,
            fields_num,
            skip_headers,
            "Resolved delimited file configuration"
        );

        Ok(Config {
            target: Target::Path(path),
            headers,
            skip_headers,
            col_sep,
            fields_num,
            bad_row_mode: self.bad_row_mode,
            with_quotes: self.with_quotes,
            terminator: self.terminator,
        })
    }
}

/// Rejects separators the `csv` crate cannot express or that would clash
/// with quoting and line handling.
pub(crate) fn validate_separator(sep: char) -> Result<u8> {
    match sep {
        '"' | '\r' | '\n' => Err(Error::UnsupportedSeparator(sep)),
        c if c.is_ascii() => Ok(c as u8),
        c => Err(Error::UnsupportedSeparator(c)),
    }
}
