//! Pull-based streaming CSV reader.
//!
//! Each call to [`Iterator::next`] reads just enough physical lines to
//! produce one row, so memory is bounded by the longest record rather than
//! the file size. Problems are collected instead of raised: structural
//! corruption drops the affected row, ambiguities are recorded as warnings,
//! and only an I/O failure ends the parse early.
//!
//! Dialect: comma delimiter, `"` quoting with `""` escapes, quoted fields may
//! span lines, LF or CRLF endings, optional UTF-8 BOM. Invalid UTF-8 is
//! replaced with U+FFFD.
//!
//! The tokenizer is hand-written rather than built on `csv`/`csv-core`:
//! csv-core silently accepts an unclosed quote and text after a closing
//! quote, and here both must surface as critical issues that drop the row.

use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;

use tl_common::{Error, Result};
use tracing::{debug, warn, Level};

use super::issue::{IssueCode, ParseIssue, ParseReport, ParseStats, MAX_RETAINED_ISSUES};

/// Options for one parse. Built with [`ReaderOptions::new`] and the
/// `with_*`/`without_*` methods so the progress interval stays non-zero.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Name used in log lines and errors.
    source: String,
    /// First record holds column names.
    has_header: bool,
    /// Log progress every N emitted rows.
    progress_every_rows: u64,
}

impl ReaderOptions {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            has_header: true,
            progress_every_rows: 100_000,
        }
    }

    pub fn without_header(mut self) -> Self {
        self.has_header = false;
        self
    }

    pub fn with_progress_every(mut self, rows: u64) -> Self {
        self.progress_every_rows = rows.max(1);
        self
    }
}

/// One parsed row: column name → trimmed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    headers: Arc<[String]>,
    values: Vec<String>,
    line: u64,
}

impl RawRow {
    pub fn new(headers: Arc<[String]>, values: Vec<String>, line: u64) -> Self {
        Self {
            headers,
            values,
            line,
        }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let (headers, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .unzip();
        Self::new(headers.into(), values, 0)
    }

    /// Value of `column`, or `None` if the column is absent from this row.
    ///
    /// With duplicate header names the first occurrence wins.
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.values.get(idx).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .zip(self.values.iter())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// One-based physical line where the record starts.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// A row is valid when at least one field holds a non-empty value.
    pub fn is_valid(&self) -> bool {
        self.values.iter().any(|v| !v.is_empty())
    }
}

/// Open a reader over any byte source.
pub fn parse<R: Read>(reader: R, options: ReaderOptions) -> CsvReader<BufReader<R>> {
    CsvReader::new(BufReader::new(reader), options)
}

/// Streaming CSV reader. Finite and not restartable.
#[derive(Debug)]
pub struct CsvReader<R> {
    source: R,
    options: ReaderOptions,
    headers: Option<Arc<[String]>>,
    buf: Vec<u8>,
    line: u64,
    records: u64,
    stats: ParseStats,
    issues: Vec<ParseIssue>,
    io_error: Option<io::Error>,
    done: bool,
}

impl<R: BufRead> CsvReader<R> {
    pub fn new(source: R, options: ReaderOptions) -> Self {
        Self {
            source,
            options,
            headers: None,
            buf: Vec::with_capacity(256),
            line: 0,
            records: 0,
            stats: ParseStats::default(),
            issues: Vec::new(),
            io_error: None,
            done: false,
        }
    }

    /// Column names, once the header has been read.
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    /// Running counters; final once iteration has returned `None`.
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Consume any remaining rows and return the completion report.
    ///
    /// Rows not yet pulled are discarded. An I/O failure at any point turns
    /// into [`Error::UnreadableInput`].
    pub fn finish(mut self) -> Result<ParseReport> {
        for _ in self.by_ref() {}
        if let Some(err) = self.io_error.take() {
            return Err(Error::unreadable(self.options.source, err));
        }
        Ok(ParseReport {
            stats: self.stats,
            issues: self.issues,
        })
    }

    fn record_issue(&mut self, issue: ParseIssue) {
        if issue.is_critical() {
            self.stats.critical += 1;
        } else {
            self.stats.warnings += 1;
        }
        let source = &self.options.source;
        if issue.severity.level() == Level::WARN {
            warn!(source = %source, code = %issue.code, line = issue.line, "{}", issue.message);
        } else {
            debug!(source = %source, code = %issue.code, line = issue.line, "{}", issue.message);
        }
        if self.issues.len() < MAX_RETAINED_ISSUES {
            self.issues.push(issue);
        }
    }

    /// Read physical lines until one complete record is tokenized.
    fn next_record(&mut self) -> Option<Tokenized> {
        let mut tok = Tokenizer::default();
        loop {
            self.buf.clear();
            match self.source.read_until(b'\n', &mut self.buf) {
                Ok(0) => return tok.started.then(|| tok.finish_at_eof()),
                Ok(_) => {}
                Err(err) => {
                    self.io_error = Some(err);
                    return None;
                }
            }
            self.line += 1;

            let text = String::from_utf8_lossy(&self.buf);
            let mut content: &str = &text;
            if self.line == 1 {
                content = content.strip_prefix('\u{feff}').unwrap_or(content);
            }
            content = content.strip_suffix('\n').unwrap_or(content);
            content = content.strip_suffix('\r').unwrap_or(content);

            if !tok.started {
                if content.is_empty() {
                    self.stats.blank_lines += 1;
                    continue;
                }
                tok.start_line = self.line;
            }
            tok.feed(content);
            if tok.in_quotes {
                tok.current.push('\n');
                continue;
            }
            return Some(tok.finish());
        }
    }

    fn install_header(&mut self, record: Tokenized) {
        if let Some(code) = record.corruption {
            self.record_issue(ParseIssue::new(
                code,
                None,
                record.start_line,
                "header row is malformed; using it as parsed",
            ));
        }
        if record.fields.len() == 1 {
            self.record_issue(ParseIssue::new(
                IssueCode::UndetectableDelimiter,
                None,
                record.start_line,
                "header has a single column; defaulted to comma",
            ));
        }
        let headers: Vec<String> = record.fields.iter().map(|f| f.trim().to_string()).collect();
        debug!(source = %self.options.source, columns = headers.len(), "header read");
        self.headers = Some(headers.into());
    }

    /// Header set for a row of `width` fields in header-less mode.
    fn positional_headers(&mut self, width: usize) -> Arc<[String]> {
        match &self.headers {
            Some(h) if h.len() >= width => Arc::clone(h),
            _ => {
                let h: Arc<[String]> = (0..width).map(|i| i.to_string()).collect();
                self.headers = Some(Arc::clone(&h));
                h
            }
        }
    }

    fn log_completion(&self) {
        let s = &self.stats;
        if s.critical > 0 {
            warn!(
                source = %self.options.source,
                rows = s.rows,
                critical = s.critical,
                corrupt_rows = s.corrupt_rows,
                "CSV parse finished with critical errors"
            );
        } else if s.warnings > 0 {
            debug!(source = %self.options.source, rows = s.rows, warnings = s.warnings, "CSV parse finished with warnings");
        } else {
            debug!(source = %self.options.source, rows = s.rows, "CSV parse finished");
        }
    }
}

impl<R: BufRead> Iterator for CsvReader<R> {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        if self.done {
            return None;
        }
        loop {
            let Some(record) = self.next_record() else {
                self.done = true;
                self.log_completion();
                return None;
            };

            if self.options.has_header && self.headers.is_none() {
                self.install_header(record);
                continue;
            }

            let row_index = self.records;
            self.records += 1;

            if let Some(code) = record.corruption {
                self.stats.corrupt_rows += 1;
                let message = match code {
                    IssueCode::MissingQuotes => "quoted field is never closed".to_string(),
                    _ => "unexpected text after closing quote".to_string(),
                };
                self.record_issue(ParseIssue::new(code, Some(row_index), record.start_line, message));
                continue;
            }

            let values: Vec<String> = record
                .fields
                .into_iter()
                .map(|f| {
                    let trimmed = f.trim();
                    if trimmed.len() == f.len() {
                        f
                    } else {
                        trimmed.to_string()
                    }
                })
                .collect();

            let headers = if self.options.has_header {
                let headers = self.headers.clone().unwrap_or_else(|| Arc::from(Vec::new()));
                if values.len() != headers.len() {
                    let code = if values.len() < headers.len() {
                        IssueCode::TooFewFields
                    } else {
                        IssueCode::TooManyFields
                    };
                    self.record_issue(ParseIssue::new(
                        code,
                        Some(row_index),
                        record.start_line,
                        format!("expected {} fields, found {}", headers.len(), values.len()),
                    ));
                }
                headers
            } else {
                self.positional_headers(values.len())
            };

            let row = RawRow::new(headers, values, record.start_line);
            if !row.is_valid() {
                self.stats.empty_rows += 1;
                continue;
            }

            self.stats.rows += 1;
            if self
                .stats
                .rows
                .checked_rem(self.options.progress_every_rows)
                .is_some_and(|r| r == 0)
            {
                debug!(source = %self.options.source, rows = self.stats.rows, "parsed rows so far");
            }
            return Some(row);
        }
    }
}

/// A record split into raw (untrimmed) fields.
#[derive(Debug)]
struct Tokenized {
    fields: Vec<String>,
    start_line: u64,
    corruption: Option<IssueCode>,
}

/// Character-level state machine for one record across one or more lines.
#[derive(Debug, Default)]
struct Tokenizer {
    fields: Vec<String>,
    current: String,
    in_quotes: bool,
    field_quoted: bool,
    after_quote: bool,
    started: bool,
    start_line: u64,
    corruption: Option<IssueCode>,
}

impl Tokenizer {
    fn feed(&mut self, line: &str) {
        self.started = true;
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            if self.in_quotes {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        self.current.push('"');
                    } else {
                        self.in_quotes = false;
                        self.after_quote = true;
                    }
                } else {
                    self.current.push(c);
                }
                continue;
            }

            if c == ',' {
                self.end_field();
            } else if self.after_quote {
                // Whitespace between a closing quote and the delimiter is tolerated.
                if !c.is_whitespace() {
                    self.corruption.get_or_insert(IssueCode::InvalidQuotes);
                    self.after_quote = false;
                    self.current.push(c);
                }
            } else if c == '"' && !self.field_quoted && self.current.trim().is_empty() {
                self.current.clear();
                self.in_quotes = true;
                self.field_quoted = true;
            } else {
                self.current.push(c);
            }
        }
    }

    fn end_field(&mut self) {
        self.fields.push(std::mem::take(&mut self.current));
        self.field_quoted = false;
        self.after_quote = false;
    }

    fn finish(mut self) -> Tokenized {
        self.end_field();
        Tokenized {
            fields: self.fields,
            start_line: self.start_line,
            corruption: self.corruption,
        }
    }

    fn finish_at_eof(mut self) -> Tokenized {
        if self.in_quotes {
            self.corruption = Some(IssueCode::MissingQuotes);
        }
        self.finish()
    }
}
