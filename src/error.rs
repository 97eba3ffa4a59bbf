//! Error types for loading datasets and shaping chart data.

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Cell-level coercion never produces one of these; an unusable cell is
/// simply missing.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The tabular source could not be parsed.
    #[error("failed to read CSV: {message}")]
    Parse { message: String },

    /// A chart request is missing a required binding.
    #[error("{message}")]
    Validation { message: String },

    /// The chart kind is not one of the supported kinds.
    #[error("Unsupported chart type: {chart}")]
    UnsupportedChart { chart: String },

    /// A binding or query names a column the dataset does not have.
    #[error("column '{column}' not found")]
    UnknownColumn { column: String },

    /// No dataset is stored under the given token.
    #[error("Invalid or missing token. Upload a CSV first.")]
    TokenNotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn parse(message: impl Into<String>) -> Self {
        EngineError::Parse {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation {
            message: message.into(),
        }
    }

    /// Machine-readable kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Parse { .. } => "parse_error",
            EngineError::Validation { .. } => "validation_error",
            EngineError::UnsupportedChart { .. } => "unsupported_chart",
            EngineError::UnknownColumn { .. } => "unknown_column",
            EngineError::TokenNotFound => "token_not_found",
            EngineError::Io(_) => "io_error",
        }
    }

    /// True for errors caused by the caller's input rather than the engine.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, EngineError::Io(_))
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<csv::Error> for EngineError {
    fn from(err: csv::Error) -> Self {
        EngineError::parse(err.to_string())
    }
}

/// Structured error as handed back across the request boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}
