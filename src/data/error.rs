//! Error types for data operations
//!
//! Provides unified error handling for grid mutation, ingestion and
//! series extraction.

use thiserror::Error;

/// Which dimension of the grid an index refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Row => f.write_str("row"),
            Axis::Column => f.write_str("column"),
        }
    }
}

/// Errors that can occur during data operations
#[derive(Error, Debug)]
pub enum DataError {
    /// Grid accessor or mutation called with an index outside the grid
    #[error("{axis} {index} out of range (len {len})")]
    OutOfRange { axis: Axis, index: usize, len: usize },

    /// Extraction requested against a row/column that does not exist
    #[error("invalid {axis} index {index} (len {len})")]
    InvalidIndex { axis: Axis, index: usize, len: usize },

    /// IO error from std::io
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source bytes are not valid under the declared encoding
    #[error("decode error: {0}")]
    Decode(String),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(String),

    /// Encoding label not known to the decoder
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Ingestion options rejected before starting a job
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// JSON parsing error from serde_json
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error message
    #[error("{0}")]
    Other(String),
}

/// Result type alias for data operations
pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    pub(crate) fn row_out_of_range(index: usize, len: usize) -> Self {
        DataError::OutOfRange { axis: Axis::Row, index, len }
    }

    pub(crate) fn column_out_of_range(index: usize, len: usize) -> Self {
        DataError::OutOfRange { axis: Axis::Column, index, len }
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            // The decoding layer reports malformed input as InvalidData
            csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::InvalidData => {
                DataError::Decode(io.to_string())
            }
            csv::ErrorKind::Io(io) => DataError::Io(io),
            csv::ErrorKind::Utf8 { pos, err } => {
                let line = pos.map(|p| p.line()).unwrap_or(0);
                DataError::Decode(format!("line {}: {}", line, err))
            }
            _ => DataError::Csv(message),
        }
    }
}

impl From<String> for DataError {
    fn from(s: String) -> Self {
        DataError::Other(s)
    }
}

impl From<&str> for DataError {
    fn from(s: &str) -> Self {
        DataError::Other(s.to_string())
    }
}
