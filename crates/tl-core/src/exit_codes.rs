//! Exit codes for the tl-core CLI.
//!
//! Exit codes communicate the outcome without requiring output parsing.

use tl_common::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Everything loaded and the command succeeded
    Clean = 0,

    /// Succeeded, but some files failed, were skipped or were empty
    Warnings = 1,

    /// Configuration error
    ConfigError = 10,

    /// No input could be loaded
    InputError = 11,

    /// Aggregation query rejected
    QueryError = 12,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::Warnings)
    }

    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config(_) | Error::InvalidConfig(_) => ExitCode::ConfigError,
            Error::UnreadableInput { .. } | Error::UnknownKind { .. } | Error::EmptyResult { .. } => {
                ExitCode::InputError
            }
            Error::NotAggregatable(_) | Error::InvalidQuery(_) => ExitCode::QueryError,
            Error::Io(_) => ExitCode::IoError,
            Error::Json(_) => ExitCode::InternalError,
        }
    }
}
