//! Span counts and duration statistics per bucket for `trace_span` data.

use serde::Serialize;
use std::collections::BTreeMap;
use tl_math::RunningSummary;

use super::bucket::Bucket;
use super::AggregateQuery;
use crate::downsample::TimeOrdered;
use crate::records::TraceSpan;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracePoint {
    pub bucket: Bucket,
    pub count: u64,
    pub mean_duration: f64,
    pub max_duration: f64,
    pub min_duration: f64,
}

impl TimeOrdered for TracePoint {
    fn timestamp(&self) -> f64 {
        self.bucket.start as f64
    }

    fn label(&self) -> &str {
        &self.bucket.label
    }
}

/// Bucket spans by start time (milliseconds converted to seconds).
pub fn aggregate_traces<'a>(
    spans: impl IntoIterator<Item = &'a TraceSpan>,
    query: &AggregateQuery,
) -> Vec<TracePoint> {
    let bucketing = query.bucketing();
    let mut buckets: BTreeMap<i64, RunningSummary> = BTreeMap::new();

    for span in spans {
        let t = span.timestamp_secs();
        if !query.admits(&span.component, t) {
            continue;
        }
        buckets
            .entry(bucketing.start_of(t))
            .or_default()
            .push(span.duration);
    }

    buckets
        .into_iter()
        .filter_map(|(start, durations)| {
            let s = durations.finish()?;
            Some(TracePoint {
                bucket: Bucket {
                    start,
                    label: bucketing.label(start),
                },
                count: s.count,
                mean_duration: s.mean,
                max_duration: s.max,
                min_duration: s.min,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::EntityFilter;
    use tl_common::RecordKind;

    fn span(ms: f64, cmdb_id: &str, duration: f64) -> TraceSpan {
        TraceSpan {
            timestamp: ms,
            component: cmdb_id.to_string(),
            duration,
            ..Default::default()
        }
    }

    #[test]
    fn milliseconds_bucketed_as_seconds() {
        let spans = [
            span(60_000.0, "web", 10.0),
            span(119_999.0, "web", 30.0),
            span(120_000.0, "web", 5.0),
        ];
        let points = aggregate_traces(&spans, &AggregateQuery::new(RecordKind::TraceSpan));
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].bucket.start, 60);
        assert_eq!(points[0].count, 2);
        assert_eq!(points[0].mean_duration, 20.0);
        assert_eq!(points[0].max_duration, 30.0);
        assert_eq!(points[0].min_duration, 10.0);
        assert_eq!(points[1].count, 1);
    }

    #[test]
    fn component_and_window_filters() {
        let spans = [
            span(1_000_000.0, "web", 1.0),
            span(1_000_000.0, "db", 2.0),
            span(1_005_000.0, "web", 3.0),
        ];
        let q = AggregateQuery::new(RecordKind::TraceSpan)
            .with_entity(EntityFilter::only("web"))
            .with_window(990.0, 1002.0);
        let points = aggregate_traces(&spans, &q);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].count, 1);
        assert_eq!(points[0].mean_duration, 1.0);
    }
}
