//! File name → record kind detection and date-label extraction.

use regex::Regex;
use std::sync::LazyLock;
use tl_common::RecordKind;

/// Substring rules, checked in order against the lower-cased name.
/// Specific names come before the generic `log`/`trace` substrings.
const RULES: &[(&str, RecordKind)] = &[
    ("metric_app", RecordKind::MetricApp),
    ("metric_container", RecordKind::MetricContainer),
    ("trace_span", RecordKind::TraceSpan),
    ("trace", RecordKind::TraceSpan),
    ("log_service", RecordKind::Log),
    ("log", RecordKind::Log),
    ("record", RecordKind::Record),
    ("query", RecordKind::Query),
];

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}_\d{2}_\d{2}").expect("regex"));

/// Record kind declared by a file name, or `None` if no rule matches.
pub fn detect(file_name: &str) -> Option<RecordKind> {
    let lower = file_name.to_lowercase();
    RULES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|&(_, kind)| kind)
}

/// First `YYYY_MM_DD` token in the name. Advisory only.
pub fn date_label(file_name: &str) -> Option<String> {
    DATE_RE.find(file_name).map(|m| m.as_str().to_string())
}
