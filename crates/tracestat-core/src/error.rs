use std::path::PathBuf;
use thiserror::Error;

use crate::model::Address;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid cost model: {0}")]
    CostModel(String),

    #[error("Line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: LineError,
    },

    #[error("No cycle cost defined for instruction '{0}'")]
    MissingCost(String),

    #[error("Instruction '{0}' does not belong to any category")]
    MissingCategory(String),

    #[error("Call site {0:#x} has no recorded block")]
    UnknownBlock(Address),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Counter overflow: {0}")]
    Overflow(String),
}

impl Error {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a single trace line could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("not a call trace line: '{0}'")]
    NotACallLine(String),

    #[error("wrong hart id '{0}', only single-hart traces (hart 0) are supported")]
    WrongHart(String),

    #[error("malformed call line: '{0}'")]
    MalformedCall(String),

    #[error("malformed instruction line: '{0}'")]
    MalformedInstruction(String),

    #[error("invalid hex {field} '{value}'")]
    InvalidHex { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
