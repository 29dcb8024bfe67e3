use arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use thiserror::Error;

use crate::formats::FileFormat;

/// Errors raised while importing referenced files and running a query.
#[derive(Error, Debug)]
pub enum ShelectError {
    #[error("cannot read table file '{path}'")]
    NotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid contents in '{path}'")]
    Format {
        path: String,
        #[source]
        source: FormatError,
    },

    #[error("cannot import '{0}': a table with that name already exists")]
    TableExists(String),

    #[error(transparent)]
    Engine(#[from] DataFusionError),

    #[error(transparent)]
    Arrow(#[from] ArrowError),

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// A file's contents do not match the format chosen for it.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("invalid JSON")]
    Json(#[from] serde_json::Error),

    #[error("expected a top-level JSON array of objects, found {0}")]
    NotAnArray(&'static str),

    #[error("element {index} of the top-level array is {found}, expected an object")]
    NotAnObject { index: usize, found: &'static str },

    #[error("missing header row")]
    MissingHeader,

    #[error("line {line}: record has {found} fields but the header has {expected}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("{format} {setting} must be a single ASCII character, found {found:?}")]
    Dialect {
        format: FileFormat,
        setting: &'static str,
        found: char,
    },
}

pub type Result<T, E = ShelectError> = std::result::Result<T, E>;
