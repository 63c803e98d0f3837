//! Time-bucketed aggregation over loaded datasets.
//!
//! Every query recomputes from the immutable records; nothing is cached here.
//! Callers that memoize can key on [`AggregateQuery::cache_key`].

pub mod bucket;
pub mod container;
pub mod service;
pub mod trace;

pub use bucket::{Bucket, Bucketing, TimeWindow};
pub use container::{aggregate_containers, select_kpis, ContainerPoint, KpiFrame, KpiRow};
pub use service::{aggregate_services, ServicePoint, ServiceStats};
pub use trace::{aggregate_traces, TracePoint};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::convert::Infallible;
use std::str::FromStr;
use tl_common::{Error, RecordKind, Result};
use tl_config::AggregateConfig;
use tracing::debug;

use crate::downsample::downsample;
use crate::records::Records;

// ── Query ───────────────────────────────────────────────────────────────

/// Which entity (service or component id) a query keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityFilter {
    #[default]
    All,
    Only(String),
}

impl EntityFilter {
    pub fn only(id: impl Into<String>) -> Self {
        EntityFilter::Only(id.into())
    }

    pub fn matches(&self, id: &str) -> bool {
        match self {
            EntityFilter::All => true,
            EntityFilter::Only(want) => want == id,
        }
    }
}

impl FromStr for EntityFilter {
    type Err = Infallible;

    /// `all` selects everything; anything else is an exact id.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(if s == "all" {
            EntityFilter::All
        } else {
            EntityFilter::only(s)
        })
    }
}

/// Parameters of one aggregation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateQuery {
    pub kind: RecordKind,
    pub entity: EntityFilter,
    /// `None` disables time filtering.
    pub window: Option<TimeWindow>,
    pub window_pad_secs: f64,
    /// KPI allow-list for `metric_container`; `None` or empty selects the
    /// first `kpi_cap` KPIs.
    pub kpis: Option<Vec<String>>,
    pub bucket_secs: i64,
    pub service_cap: usize,
    pub kpi_cap: usize,
    pub max_points: usize,
}

impl AggregateQuery {
    pub fn new(kind: RecordKind) -> Self {
        Self::from_config(kind, &AggregateConfig::default())
    }

    pub fn from_config(kind: RecordKind, config: &AggregateConfig) -> Self {
        Self {
            kind,
            entity: EntityFilter::All,
            window: None,
            window_pad_secs: config.window_pad_secs,
            kpis: None,
            bucket_secs: config.bucket_secs,
            service_cap: config.service_cap,
            kpi_cap: config.kpi_cap,
            max_points: config.max_points,
        }
    }

    pub fn with_entity(mut self, entity: EntityFilter) -> Self {
        self.entity = entity;
        self
    }

    pub fn with_window(mut self, start: f64, end: f64) -> Self {
        self.window = Some(TimeWindow::new(start, end));
        self
    }

    pub fn with_kpis<I, S>(mut self, kpis: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kpis = Some(kpis.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn bucketing(&self) -> Bucketing {
        Bucketing::new(self.bucket_secs)
    }

    /// Entity and window filter, applied before bucketing.
    pub fn admits(&self, entity: &str, t: f64) -> bool {
        self.entity.matches(entity)
            && self
                .window
                .map_or(true, |w| w.contains(t, self.window_pad_secs))
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket_secs < 1 {
            return Err(Error::InvalidQuery(format!(
                "bucket_secs must be at least 1, got {}",
                self.bucket_secs
            )));
        }
        if !self.window_pad_secs.is_finite() || self.window_pad_secs < 0.0 {
            return Err(Error::InvalidQuery(format!(
                "window_pad_secs must be a non-negative number, got {}",
                self.window_pad_secs
            )));
        }
        if let Some(w) = &self.window {
            if !w.is_well_formed() {
                return Err(Error::InvalidQuery(format!(
                    "time window [{}, {}] is empty or not finite",
                    w.start, w.end
                )));
            }
        }
        if self.service_cap == 0 || self.kpi_cap == 0 {
            return Err(Error::InvalidQuery(
                "service_cap and kpi_cap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// SHA-256 of the serialized query, hex encoded.
    pub fn cache_key(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

// ── Output ──────────────────────────────────────────────────────────────

/// Aggregated, downsampled series, shaped by record kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Series {
    Service {
        services: Vec<String>,
        points: Vec<ServicePoint>,
    },
    /// `points` holds every `(bucket, kpi)` group; only `frame` is downsampled.
    Container {
        kpis: Vec<String>,
        points: Vec<ContainerPoint>,
        frame: KpiFrame,
    },
    Trace {
        points: Vec<TracePoint>,
    },
}

impl Series {
    /// Number of chartable rows.
    pub fn len(&self) -> usize {
        match self {
            Series::Service { points, .. } => points.len(),
            Series::Container { frame, .. } => frame.rows.len(),
            Series::Trace { points } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat rows keyed by `time` plus one field per charted value.
    pub fn chart_rows(&self) -> Vec<Map<String, Value>> {
        match self {
            Series::Service { points, .. } => points.iter().map(ServicePoint::chart_row).collect(),
            Series::Container { frame, .. } => frame.chart_rows(),
            Series::Trace { points } => points
                .iter()
                .map(|p| {
                    let mut row = Map::new();
                    row.insert("time".into(), Value::from(p.bucket.label.clone()));
                    row.insert("count".into(), Value::from(p.count));
                    row.insert("mean_duration".into(), Value::from(p.mean_duration));
                    row.insert("max_duration".into(), Value::from(p.max_duration));
                    row.insert("min_duration".into(), Value::from(p.min_duration));
                    row
                })
                .collect(),
        }
    }
}

/// Result of [`aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesReport {
    pub kind: RecordKind,
    pub cache_key: String,
    /// Records of the queried kind, before filtering.
    pub records_in: u64,
    /// Chartable rows before downsampling.
    pub rows_before_sampling: usize,
    pub downsampled: bool,
    pub series: Series,
}

// ── Dispatch ────────────────────────────────────────────────────────────

/// Aggregate every dataset of `query.kind` into one series.
///
/// Datasets of other kinds are ignored. Empty input yields an empty series.
pub fn aggregate<'a>(
    datasets: impl IntoIterator<Item = &'a Records>,
    query: &AggregateQuery,
) -> Result<SeriesReport> {
    if !query.kind.is_aggregatable() {
        return Err(Error::NotAggregatable(query.kind));
    }
    query.validate()?;

    let selected: Vec<&Records> = datasets
        .into_iter()
        .filter(|r| r.kind() == query.kind)
        .collect();
    let records_in: u64 = selected.iter().map(|r| r.len() as u64).sum();

    let (series, rows_before_sampling) = match query.kind {
        kind if kind.is_service_kpi() => {
            let rows = selected.iter().filter_map(|r| r.service_kpis()).flatten();
            let (services, points) = aggregate_services(rows, query);
            let before = points.len();
            let points = downsample(points, query.max_points);
            (Series::Service { services, points }, before)
        }
        RecordKind::MetricContainer => {
            let rows = selected.iter().filter_map(|r| r.container_metrics()).flatten();
            let points = aggregate_containers(rows, query);
            let kpis = select_kpis(&points, query.kpis.as_deref(), query.kpi_cap);
            let mut frame = KpiFrame::pivot(&points, kpis.clone(), query.bucketing());
            let before = frame.rows.len();
            frame.rows = downsample(frame.rows, query.max_points);
            (Series::Container { kpis, points, frame }, before)
        }
        RecordKind::TraceSpan => {
            let spans = selected.iter().filter_map(|r| r.trace_spans()).flatten();
            let points = aggregate_traces(spans, query);
            let before = points.len();
            let points = downsample(points, query.max_points);
            (Series::Trace { points }, before)
        }
        other => return Err(Error::NotAggregatable(other)),
    };

    let downsampled = series.len() < rows_before_sampling;
    debug!(
        kind = %query.kind,
        datasets = selected.len(),
        records_in,
        rows = series.len(),
        downsampled,
        "aggregation complete"
    );
    Ok(SeriesReport {
        kind: query.kind,
        cache_key: query.cache_key()?,
        records_in,
        rows_before_sampling,
        downsampled,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ContainerMetric, ServiceKpi, TraceSpan};

    fn log_rows() -> Records {
        Records::Log(vec![
            ServiceKpi {
                timestamp: 1020.0,
                response_rate: 90.0,
                success_rate: 99.0,
                mean_response_time: 120.0,
                service: "svc-a".into(),
                ..Default::default()
            },
            ServiceKpi {
                timestamp: 1050.0,
                response_rate: 95.0,
                success_rate: 98.0,
                mean_response_time: 110.0,
                service: "svc-a".into(),
                ..Default::default()
            },
        ])
    }

    #[test]
    fn record_and_query_not_aggregatable() {
        for kind in [RecordKind::Record, RecordKind::Query] {
            let err = aggregate(Vec::<&Records>::new(), &AggregateQuery::new(kind)).unwrap_err();
            assert!(matches!(err, Error::NotAggregatable(k) if k == kind));
        }
    }

    #[test]
    fn log_end_to_end() {
        let datasets = [log_rows()];
        let report = aggregate(&datasets, &AggregateQuery::new(RecordKind::Log)).unwrap();
        assert_eq!(report.records_in, 2);
        let rows = report.series.chart_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["svc-a_rr"], 92.5);
    }

    #[test]
    fn other_kinds_ignored() {
        let datasets = [log_rows()];
        let report = aggregate(&datasets, &AggregateQuery::new(RecordKind::MetricApp)).unwrap();
        assert_eq!(report.records_in, 0);
        assert!(report.series.is_empty());
    }

    #[test]
    fn series_downsampled_to_budget() {
        let spans = (0..100)
            .map(|i| TraceSpan {
                timestamp: i as f64 * 60_000.0,
                duration: i as f64,
                ..Default::default()
            })
            .collect();
        let datasets = [Records::TraceSpan(spans)];
        let query = AggregateQuery::new(RecordKind::TraceSpan).with_max_points(10);
        let report = aggregate(&datasets, &query).unwrap();
        assert_eq!(report.rows_before_sampling, 100);
        assert!(report.downsampled);
        assert_eq!(report.series.len(), 10);
        match &report.series {
            Series::Trace { points } => {
                assert_eq!(points[0].bucket.start, 0);
                assert_eq!(points[9].bucket.start, 99 * 60);
            }
            other => panic!("unexpected series {other:?}"),
        }
    }

    #[test]
    fn container_frame_uses_allow_list() {
        let datasets = [Records::MetricContainer(vec![
            ContainerMetric {
                timestamp: 0.0,
                component: "c".into(),
                kpi: "cpu".into(),
                value: 1.0,
            },
            ContainerMetric {
                timestamp: 0.0,
                component: "c".into(),
                kpi: "mem".into(),
                value: 2.0,
            },
        ])];
        let query = AggregateQuery::new(RecordKind::MetricContainer).with_kpis(["mem"]);
        let report = aggregate(&datasets, &query).unwrap();
        match &report.series {
            Series::Container { kpis, points, frame } => {
                assert_eq!(kpis, &vec!["mem".to_string()]);
                assert_eq!(points.len(), 2);
                assert_eq!(frame.rows[0].values, vec![Some(2.0)]);
            }
            other => panic!("unexpected series {other:?}"),
        }
    }

    #[test]
    fn invalid_window_rejected() {
        let query = AggregateQuery::new(RecordKind::Log).with_window(10.0, 5.0);
        let err = aggregate(Vec::<&Records>::new(), &query).unwrap_err();
        assert_eq!(err.code(), 31);
    }

    #[test]
    fn cache_key_tracks_parameters() {
        let a = AggregateQuery::new(RecordKind::Log);
        let b = a.clone().with_entity(EntityFilter::only("svc-a"));
        let ka = a.cache_key().unwrap();
        assert_eq!(ka.len(), 64);
        assert_eq!(ka, a.clone().cache_key().unwrap());
        assert_ne!(ka, b.cache_key().unwrap());
    }

    #[test]
    fn entity_filter_parse() {
        assert_eq!("all".parse::<EntityFilter>(), Ok(EntityFilter::All));
        assert_eq!(
            "db-1".parse::<EntityFilter>(),
            Ok(EntityFilter::only("db-1"))
        );
    }
}
