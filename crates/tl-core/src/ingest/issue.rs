//! Row- and file-level parse issues collected by the CSV reader.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on issues retained per file; the remainder are only counted.
pub const MAX_RETAINED_ISSUES: usize = 1000;

/// How much an issue says about data loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Parser-configuration ambiguity; the row (if any) is kept.
    Warning,
    /// Structural corruption; the affected row is dropped.
    Critical,
}

impl Severity {
    /// Log level for a single issue of this severity.
    pub fn level(self) -> tracing::Level {
        match self {
            Severity::Warning => tracing::Level::DEBUG,
            Severity::Critical => tracing::Level::WARN,
        }
    }
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    /// Header has a single column, so the parse defaulted to comma.
    UndetectableDelimiter,
    /// Row has fewer fields than the header; missing columns are absent.
    TooFewFields,
    /// Row has more fields than the header; extras are ignored.
    TooManyFields,
    /// A quoted field is never closed before end of input.
    MissingQuotes,
    /// Text follows a closing quote before the next delimiter.
    InvalidQuotes,
}

impl IssueCode {
    pub fn severity(self) -> Severity {
        match self {
            IssueCode::UndetectableDelimiter
            | IssueCode::TooFewFields
            | IssueCode::TooManyFields => Severity::Warning,
            IssueCode::MissingQuotes | IssueCode::InvalidQuotes => Severity::Critical,
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One collected issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub severity: Severity,
    pub code: IssueCode,
    /// Zero-based data row index (header excluded); `None` for file-level issues.
    pub row: Option<u64>,
    /// One-based physical line where the record starts.
    pub line: u64,
    pub message: String,
}

impl ParseIssue {
    pub fn new(code: IssueCode, row: Option<u64>, line: u64, message: impl Into<String>) -> Self {
        Self {
            severity: code.severity(),
            code,
            row,
            line,
            message: message.into(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Row accounting for one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Rows handed to the caller.
    pub rows: u64,
    /// Physical lines skipped because they were empty.
    pub blank_lines: u64,
    /// Records dropped because every field was empty.
    pub empty_rows: u64,
    /// Records dropped because of a critical issue.
    pub corrupt_rows: u64,
    pub warnings: u64,
    pub critical: u64,
}

impl ParseStats {
    /// Records that were parsed but not handed to the caller.
    pub fn dropped(&self) -> u64 {
        self.empty_rows + self.corrupt_rows
    }
}

/// Completion result of a parse: what was produced and what went wrong.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseReport {
    pub stats: ParseStats,
    /// At most [`MAX_RETAINED_ISSUES`] issues, in input order.
    pub issues: Vec<ParseIssue>,
}

impl ParseReport {
    pub fn critical(&self) -> impl Iterator<Item = &ParseIssue> {
        self.issues.iter().filter(|i| i.is_critical())
    }

    pub fn has_critical(&self) -> bool {
        self.stats.critical > 0
    }
}
