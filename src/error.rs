use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Broad classes of failure, used by callers that only care about the kind
/// of problem (retryable I/O vs. bad input vs. user cancellation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The configuration could not be resolved; nothing was read or written.
    Configuration,
    /// A row had the wrong number of fields under `BadRowMode::Error`.
    Shape,
    /// The underlying source, sink or channel failed.
    Io,
    /// The cancellation token fired mid-stream.
    Cancellation,
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ─────────────────────────────────────────────────────────
    #[error("no input or output provided")]
    NoInputOrOutput,

    #[error("provide headers manually")]
    NoHeaders,

    #[error("provide valid input file path: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("empty first line")]
    EmptyFirstLine,

    #[error("cannot determine delimiter")]
    UndetectableDelimiter,

    #[error("unsupported column separator {0:?}")]
    UnsupportedSeparator(char),

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("unknown bad row mode '{0}', use 'error', 'skip' or 'process'")]
    UnknownBadRowMode(String),

    // ── Shape ─────────────────────────────────────────────────────────────────
    #[error("wrong number of fields on line {line}: expected {expected}, found {found}")]
    ShapeMismatch {
        line: u64,
        expected: usize,
        found: usize,
    },

    // ── I/O ───────────────────────────────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row channel closed by the receiver")]
    ChannelClosed,

    #[error("Internal error: {0}")]
    Internal(String),

    // ── Cancellation ──────────────────────────────────────────────────────────
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns the category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NoInputOrOutput
            | Error::NoHeaders
            | Error::FileMissing(_)
            | Error::EmptyFirstLine
            | Error::UndetectableDelimiter
            | Error::UnsupportedSeparator(_)
            | Error::InvalidChunkSize
            | Error::UnknownBadRowMode(_) => ErrorCategory::Configuration,

            Error::ShapeMismatch { .. } => ErrorCategory::Shape,

            Error::Io(_) | Error::Csv(_) | Error::ChannelClosed | Error::Internal(_) => {
                ErrorCategory::Io
            }

            Error::Cancelled => ErrorCategory::Cancellation,
        }
    }

    /// True if the error was caused by the cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Serialized form of an [`Error`].
#[derive(Serialize)]
struct ErrorReport<'a> {
    category: ErrorCategory,
    message: &'a str,
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let message = self.to_string();
        ErrorReport {
            category: self.category(),
            message: &message,
        }
        .serialize(serializer)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
