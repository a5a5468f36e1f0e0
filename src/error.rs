//! Error types shared by the trace pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A row is missing a required field or carries a non-numeric value.
    ///
    /// `row` counts data rows from 1 in both CSV and Parquet files; 0 means
    /// the header or schema.
    #[error("malformed trace '{trace}', row {row}: {reason}")]
    Structural {
        trace: String,
        row: usize,
        reason: String,
    },

    /// The decomposer was handed a sample it cannot filter.
    #[error("trace '{trace}' is not filterable: sample {index} (n={n}) is {what}")]
    Precondition {
        trace: String,
        index: usize,
        n: i64,
        what: &'static str,
    },

    #[error("trace '{trace}': mask has {mask} entries but trace has {samples} samples")]
    LengthMismatch {
        trace: String,
        mask: usize,
        samples: usize,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unsupported trace file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Parquet error in {}: {reason}", .path.display())]
    Parquet { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Error::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parquet(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Parquet {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
