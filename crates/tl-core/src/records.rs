//! Typed record shapes, one per record kind.
//!
//! Field names follow the CSV column names on the wire (`rr`, `cmdb_id`, ...)
//! through serde renames, while the Rust side uses descriptive names.

use serde::{Deserialize, Serialize};
use tl_common::RecordKind;

/// Tabular view of a record, used for previews and text search.
pub trait Tabular {
    /// CSV column names in display order.
    const COLUMNS: &'static [&'static str];

    /// Cell values rendered as text, aligned with [`Tabular::COLUMNS`].
    fn cells(&self) -> Vec<String>;
}

/// Service KPI snapshot shared by the `log` and `metric_app` kinds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceKpi {
    /// Epoch seconds.
    pub timestamp: f64,
    #[serde(rename = "rr")]
    pub response_rate: f64,
    #[serde(rename = "sr")]
    pub success_rate: f64,
    #[serde(rename = "cnt")]
    pub request_count: f64,
    #[serde(rename = "mrt")]
    pub mean_response_time: f64,
    #[serde(rename = "tc")]
    pub service: String,
}

impl Tabular for ServiceKpi {
    const COLUMNS: &'static [&'static str] = &["timestamp", "rr", "sr", "cnt", "mrt", "tc"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.timestamp.to_string(),
            self.response_rate.to_string(),
            self.success_rate.to_string(),
            self.request_count.to_string(),
            self.mean_response_time.to_string(),
            self.service.clone(),
        ]
    }
}

/// One KPI sample for a container/component.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContainerMetric {
    /// Epoch seconds.
    pub timestamp: f64,
    #[serde(rename = "cmdb_id")]
    pub component: String,
    #[serde(rename = "kpi_name")]
    pub kpi: String,
    pub value: f64,
}

impl Tabular for ContainerMetric {
    const COLUMNS: &'static [&'static str] = &["timestamp", "cmdb_id", "kpi_name", "value"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.timestamp.to_string(),
            self.component.clone(),
            self.kpi.clone(),
            self.value.to_string(),
        ]
    }
}

/// A distributed-trace span.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TraceSpan {
    /// Epoch milliseconds.
    pub timestamp: f64,
    #[serde(rename = "cmdb_id")]
    pub component: String,
    pub parent_id: String,
    pub span_id: String,
    pub trace_id: String,
    pub duration: f64,
}

impl TraceSpan {
    /// Start time in epoch seconds.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp / 1000.0
    }
}

impl Tabular for TraceSpan {
    const COLUMNS: &'static [&'static str] = &[
        "timestamp",
        "cmdb_id",
        "parent_id",
        "span_id",
        "trace_id",
        "duration",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.timestamp.to_string(),
            self.component.clone(),
            self.parent_id.clone(),
            self.span_id.clone(),
            self.trace_id.clone(),
            self.duration.to_string(),
        ]
    }
}

/// An incident/event record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub level: String,
    pub component: String,
    pub timestamp: f64,
    /// Human-readable time as written in the file.
    pub datetime: String,
    pub reason: String,
}

impl Tabular for IncidentRecord {
    const COLUMNS: &'static [&'static str] =
        &["level", "component", "timestamp", "datetime", "reason"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.level.clone(),
            self.component.clone(),
            self.timestamp.to_string(),
            self.datetime.clone(),
            self.reason.clone(),
        ]
    }
}

/// An evaluation query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryRecord {
    pub task_index: String,
    pub instruction: String,
    pub scoring_points: String,
}

impl Tabular for QueryRecord {
    const COLUMNS: &'static [&'static str] = &["task_index", "instruction", "scoring_points"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.task_index.clone(),
            self.instruction.clone(),
            self.scoring_points.clone(),
        ]
    }
}

/// Homogeneous record collection. The variant fixes the kind for every element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Records {
    Log(Vec<ServiceKpi>),
    MetricApp(Vec<ServiceKpi>),
    MetricContainer(Vec<ContainerMetric>),
    TraceSpan(Vec<TraceSpan>),
    Record(Vec<IncidentRecord>),
    Query(Vec<QueryRecord>),
}

impl Records {
    /// Empty collection of the given kind.
    pub fn empty(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Log => Records::Log(Vec::new()),
            RecordKind::MetricApp => Records::MetricApp(Vec::new()),
            RecordKind::MetricContainer => Records::MetricContainer(Vec::new()),
            RecordKind::TraceSpan => Records::TraceSpan(Vec::new()),
            RecordKind::Record => Records::Record(Vec::new()),
            RecordKind::Query => Records::Query(Vec::new()),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Records::Log(_) => RecordKind::Log,
            Records::MetricApp(_) => RecordKind::MetricApp,
            Records::MetricContainer(_) => RecordKind::MetricContainer,
            Records::TraceSpan(_) => RecordKind::TraceSpan,
            Records::Record(_) => RecordKind::Record,
            Records::Query(_) => RecordKind::Query,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Records::Log(v) | Records::MetricApp(v) => v.len(),
            Records::MetricContainer(v) => v.len(),
            Records::TraceSpan(v) => v.len(),
            Records::Record(v) => v.len(),
            Records::Query(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Service KPI records, for the `log` and `metric_app` kinds.
    pub fn service_kpis(&self) -> Option<&[ServiceKpi]> {
        match self {
            Records::Log(v) | Records::MetricApp(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn container_metrics(&self) -> Option<&[ContainerMetric]> {
        match self {
            Records::MetricContainer(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn trace_spans(&self) -> Option<&[TraceSpan]> {
        match self {
            Records::TraceSpan(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn incidents(&self) -> Option<&[IncidentRecord]> {
        match self {
            Records::Record(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn queries(&self) -> Option<&[QueryRecord]> {
        match self {
            Records::Query(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Column names of this collection's record shape.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Records::Log(_) | Records::MetricApp(_) => ServiceKpi::COLUMNS,
            Records::MetricContainer(_) => ContainerMetric::COLUMNS,
            Records::TraceSpan(_) => TraceSpan::COLUMNS,
            Records::Record(_) => IncidentRecord::COLUMNS,
            Records::Query(_) => QueryRecord::COLUMNS,
        }
    }

    /// Text cells of the record at `index`.
    pub fn cells(&self, index: usize) -> Option<Vec<String>> {
        match self {
            Records::Log(v) | Records::MetricApp(v) => v.get(index).map(Tabular::cells),
            Records::MetricContainer(v) => v.get(index).map(Tabular::cells),
            Records::TraceSpan(v) => v.get(index).map(Tabular::cells),
            Records::Record(v) => v.get(index).map(Tabular::cells),
            Records::Query(v) => v.get(index).map(Tabular::cells),
        }
    }
}
