//! Error types for Telemetry Lens.

use crate::kind::RecordKind;
use thiserror::Error;

/// Result type alias for Telemetry Lens operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Telemetry Lens.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Ingestion errors (20-29)
    #[error("cannot read {file}: {reason}")]
    UnreadableInput { file: String, reason: String },

    #[error("no record kind matches file name {file}")]
    UnknownKind { file: String },

    #[error("{file} produced no valid rows")]
    EmptyResult { file: String },

    // Query errors (30-39)
    #[error("record kind {0} has no time series to aggregate")]
    NotAggregatable(RecordKind),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::UnreadableInput { .. } => 20,
            Error::UnknownKind { .. } => 21,
            Error::EmptyResult { .. } => 22,
            Error::NotAggregatable(_) => 30,
            Error::InvalidQuery(_) => 31,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Build an `UnreadableInput` from any displayable cause.
    pub fn unreadable(file: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::UnreadableInput {
            file: file.into(),
            reason: reason.to_string(),
        }
    }
}
