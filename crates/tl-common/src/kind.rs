//! The closed set of telemetry record kinds.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared kind of a telemetry file. Every record in one dataset shares it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum RecordKind {
    /// Service-level KPI snapshots taken from service logs.
    Log,
    /// Service-level KPI snapshots from application metrics.
    MetricApp,
    /// One KPI value per row for a container/component.
    MetricContainer,
    /// Distributed-trace spans with millisecond timestamps.
    #[serde(alias = "trace")]
    #[value(alias = "trace")]
    TraceSpan,
    /// Incident records with severity and free-text reason.
    Record,
    /// Evaluation queries with scoring criteria.
    Query,
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        RecordKind::Log,
        RecordKind::MetricApp,
        RecordKind::MetricContainer,
        RecordKind::TraceSpan,
        RecordKind::Record,
        RecordKind::Query,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Log => "log",
            RecordKind::MetricApp => "metric_app",
            RecordKind::MetricContainer => "metric_container",
            RecordKind::TraceSpan => "trace_span",
            RecordKind::Record => "record",
            RecordKind::Query => "query",
        }
    }

    /// Kinds sharing the service KPI shape (`log` and `metric_app`).
    pub fn is_service_kpi(self) -> bool {
        matches!(self, RecordKind::Log | RecordKind::MetricApp)
    }

    /// Whether the aggregation engine produces a time series for this kind.
    pub fn is_aggregatable(self) -> bool {
        !matches!(self, RecordKind::Record | RecordKind::Query)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(RecordKind::Log),
            "metric_app" => Ok(RecordKind::MetricApp),
            "metric_container" => Ok(RecordKind::MetricContainer),
            "trace_span" | "trace" => Ok(RecordKind::TraceSpan),
            "record" => Ok(RecordKind::Record),
            "query" => Ok(RecordKind::Query),
            other => Err(format!("unknown record kind: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_roundtrips_through_from_str() {
        for kind in RecordKind::ALL {
            assert_eq!(kind.to_string().parse::<RecordKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_trace_alias() {
        assert_eq!("trace".parse::<RecordKind>(), Ok(RecordKind::TraceSpan));
        let kind: RecordKind = serde_json::from_str("\"trace\"").unwrap();
        assert_eq!(kind, RecordKind::TraceSpan);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"trace_span\"");
    }

    #[test]
    fn test_aggregatable_kinds() {
        assert!(RecordKind::Log.is_aggregatable());
        assert!(RecordKind::TraceSpan.is_aggregatable());
        assert!(!RecordKind::Record.is_aggregatable());
        assert!(!RecordKind::Query.is_aggregatable());
        assert!(RecordKind::MetricApp.is_service_kpi());
        assert!(!RecordKind::MetricContainer.is_service_kpi());
    }
}
