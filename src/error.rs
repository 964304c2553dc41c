//! Error types shared by the table engines and the session.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The source workbook could not be read, or the requested sheet does
    /// not exist in it.
    #[error("could not read {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// An operation referenced a column absent from the table's schema.
    #[error("column not found: {column}")]
    ColumnNotFound { column: String },

    /// A cell edit addressed a row past the end of the table.
    #[error("row {row} out of range (table has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    /// The target workbook could not be written, even after the text
    /// coercion retry.
    #[error("could not write {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// A statistics or chart request the data cannot satisfy (no numeric
    /// columns, empty series).
    #[error("{0}")]
    Unsupported(String),

    /// A background email send failed (connection, auth, or timeout).
    #[error("send failed: {0}")]
    Transport(String),

    /// The messaging hand-off could not drive a browser at all.
    #[error("could not open a browser session: {0}")]
    AutomationUi(String),

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn read(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
