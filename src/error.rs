//! Error types for the matrix service

use thiserror::Error;

/// Result type alias for matrix operations
pub type Result<T> = std::result::Result<T, MatrixError>;

/// Error types that can occur while loading or slicing model matrices
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("Unknown matrix: {0}")]
    UnknownMatrix(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Malformed matrix: {0}")]
    MalformedMatrix(String),

    #[error("Malformed DQI grid: {0}")]
    MalformedGrid(String),

    #[error("Row out of bounds: {row} (rows: {rows})")]
    RowOutOfBounds { row: usize, rows: usize },

    #[error("Column out of bounds: {col}")]
    ColumnOutOfBounds { col: usize },

    #[error("Invalid index: {name}={value}")]
    InvalidIndex { name: String, value: String },

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for MatrixError {
    fn from(err: std::io::Error) -> Self {
        MatrixError::IoError(err.to_string())
    }
}

impl MatrixError {
    /// Convert error to HTTP status code
    ///
    /// Addressing errors (unknown model or matrix) map to 404, selector
    /// errors map to 400 and everything that happens while reading or
    /// decoding data files is a server-side problem (500).
    pub fn to_http_status(&self) -> u16 {
        match self {
            MatrixError::UnknownMatrix(_) => 404,
            MatrixError::UnknownModel(_) => 404,

            MatrixError::RowOutOfBounds { .. } => 400,
            MatrixError::ColumnOutOfBounds { .. } => 400,
            MatrixError::InvalidIndex { .. } => 400,

            MatrixError::MalformedMatrix(_) => 500,
            MatrixError::MalformedGrid(_) => 500,
            MatrixError::IoError(_) => 500,
            MatrixError::ConfigError(_) => 500,
            MatrixError::InternalError(_) => 500,
        }
    }

    /// Whether the error was caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.to_http_status())
    }

    /// Whether the error happened while reading or decoding a data file.
    ///
    /// Load failures are never cached; the next request retries the load.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            MatrixError::MalformedMatrix(_)
                | MatrixError::MalformedGrid(_)
                | MatrixError::IoError(_)
        )
    }

    /// Create an InvalidIndex error for a query parameter
    pub fn invalid_index(name: impl Into<String>, value: impl Into<String>) -> Self {
        MatrixError::InvalidIndex {
            name: name.into(),
            value: value.into(),
        }
    }
}
