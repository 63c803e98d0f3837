//! CSV ingestion: a pull-based reader plus the issues it collects.

pub mod issue;
pub mod reader;

pub use issue::{IssueCode, ParseIssue, ParseReport, ParseStats, Severity};
pub use reader::{parse, CsvReader, RawRow, ReaderOptions};
