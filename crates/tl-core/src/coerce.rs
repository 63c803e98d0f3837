//! Total, lossy coercion from raw rows to typed records.
//!
//! Coercion never fails: a cell that does not parse degrades to `0` (numeric)
//! or `""` (string), and every input row yields exactly one record.

use tl_common::RecordKind;

use crate::ingest::RawRow;
use crate::records::{
    ContainerMetric, IncidentRecord, QueryRecord, Records, ServiceKpi, TraceSpan,
};

/// Parse a numeric cell. Missing, empty, non-numeric and NaN values become `0`.
///
/// Accepts decimal and exponent notation, a `0x`/`0o`/`0b` integer prefix, and
/// `Infinity` with an optional sign.
pub fn number(cell: Option<&str>) -> f64 {
    let Some(raw) = cell.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0.0;
    };
    parse_number(raw).filter(|v| !v.is_nan()).unwrap_or(0.0)
}

fn parse_number(s: &str) -> Option<f64> {
    match s {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).ok().map(|v| v as f64);
        }
    }
    // Rust also accepts "inf"/"nan" spellings; those are not numbers here.
    if s.bytes().any(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E')) {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Read a string cell. Missing cells become the empty string.
pub fn text(cell: Option<&str>) -> String {
    cell.unwrap_or_default().to_string()
}

/// Conversion from an untyped row into a typed record.
pub trait FromRawRow: Sized {
    fn from_raw(row: &RawRow) -> Self;
}

impl FromRawRow for ServiceKpi {
    fn from_raw(row: &RawRow) -> Self {
        Self {
            timestamp: number(row.get("timestamp")),
            response_rate: number(row.get("rr")),
            success_rate: number(row.get("sr")),
            request_count: number(row.get("cnt")),
            mean_response_time: number(row.get("mrt")),
            service: text(row.get("tc")),
        }
    }
}

impl FromRawRow for ContainerMetric {
    fn from_raw(row: &RawRow) -> Self {
        Self {
            timestamp: number(row.get("timestamp")),
            component: text(row.get("cmdb_id")),
            kpi: text(row.get("kpi_name")),
            value: number(row.get("value")),
        }
    }
}

impl FromRawRow for TraceSpan {
    fn from_raw(row: &RawRow) -> Self {
        Self {
            timestamp: number(row.get("timestamp")),
            component: text(row.get("cmdb_id")),
            parent_id: text(row.get("parent_id")),
            span_id: text(row.get("span_id")),
            trace_id: text(row.get("trace_id")),
            duration: number(row.get("duration")),
        }
    }
}

impl FromRawRow for IncidentRecord {
    fn from_raw(row: &RawRow) -> Self {
        Self {
            level: text(row.get("level")),
            component: text(row.get("component")),
            timestamp: number(row.get("timestamp")),
            datetime: text(row.get("datetime")),
            reason: text(row.get("reason")),
        }
    }
}

impl FromRawRow for QueryRecord {
    fn from_raw(row: &RawRow) -> Self {
        Self {
            task_index: text(row.get("task_index")),
            instruction: text(row.get("instruction")),
            scoring_points: text(row.get("scoring_points")),
        }
    }
}

impl Records {
    /// Coerce one raw row into this collection's record shape and append it.
    pub fn push_raw(&mut self, row: &RawRow) {
        match self {
            Records::Log(v) | Records::MetricApp(v) => v.push(ServiceKpi::from_raw(row)),
            Records::MetricContainer(v) => v.push(ContainerMetric::from_raw(row)),
            Records::TraceSpan(v) => v.push(TraceSpan::from_raw(row)),
            Records::Record(v) => v.push(IncidentRecord::from_raw(row)),
            Records::Query(v) => v.push(QueryRecord::from_raw(row)),
        }
    }
}

/// Incremental coercion for rows pulled one at a time from a reader.
#[derive(Debug)]
pub struct RecordsBuilder {
    records: Records,
}

impl RecordsBuilder {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            records: Records::empty(kind),
        }
    }

    pub fn push(&mut self, row: &RawRow) {
        self.records.push_raw(row);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(self) -> Records {
        self.records
    }
}

/// Coerce a batch of raw rows into typed records of `kind`. One-to-one.
pub fn coerce<'a>(kind: RecordKind, rows: impl IntoIterator<Item = &'a RawRow>) -> Records {
    let mut builder = RecordsBuilder::new(kind);
    for row in rows {
        builder.push(row);
    }
    builder.finish()
}
