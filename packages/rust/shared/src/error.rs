//! Error types for tabledown.
//!
//! Library crates use [`TabledownError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Ambiguous encodings, ambiguous delimiters and unrecognized headers are
//! not errors: they resolve to deterministic defaults and are reported on
//! the run report instead.

use std::path::PathBuf;

/// Top-level error type for all tabledown operations.
#[derive(Debug, thiserror::Error)]
pub enum TabledownError {
    /// Bad arguments, missing input file, or invalid configuration.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error (reading input, creating the output dir, writing a document).
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The delimited-text reader rejected a record.
    #[error("malformed record at row {row}: {message}")]
    Csv { row: usize, message: String },

    /// A row could not be rendered to Markdown.
    #[error("failed to render row {row}: {message}")]
    Render { row: usize, message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TabledownError>;

impl TabledownError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a reader error for a 1-based data row.
    pub fn csv(row: usize, msg: impl Into<String>) -> Self {
        Self::Csv {
            row,
            message: msg.into(),
        }
    }

    /// Create a render error for a 1-based data row.
    pub fn render(row: usize, msg: impl Into<String>) -> Self {
        Self::Render {
            row,
            message: msg.into(),
        }
    }
}
