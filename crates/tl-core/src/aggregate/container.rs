//! Per-bucket, per-KPI statistics for `metric_container` data, plus the
//! bucket × KPI pivot used for charting.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use tl_math::RunningSummary;

use super::bucket::{Bucket, Bucketing};
use super::AggregateQuery;
use crate::downsample::TimeOrdered;
use crate::records::ContainerMetric;

/// Statistics for one `(bucket, kpi)` group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerPoint {
    pub bucket: Bucket,
    pub kpi: String,
    /// Component of the group's first sample.
    pub component: String,
    /// Timestamp of the group's first sample.
    pub first_timestamp: f64,
    pub count: u64,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

impl TimeOrdered for ContainerPoint {
    fn timestamp(&self) -> f64 {
        self.bucket.start as f64
    }

    fn label(&self) -> &str {
        &self.bucket.label
    }
}

struct Group {
    bucket_start: i64,
    kpi: String,
    component: String,
    first_timestamp: f64,
    values: RunningSummary,
}

/// Group filtered samples by `(bucket, kpi)`.
///
/// Groups come out ascending by bucket start; within a bucket they keep the
/// order in which their KPI was first seen. An empty KPI name is a group of
/// its own.
pub fn aggregate_containers<'a>(
    records: impl IntoIterator<Item = &'a ContainerMetric>,
    query: &AggregateQuery,
) -> Vec<ContainerPoint> {
    let bucketing = query.bucketing();
    let mut index: HashMap<(i64, &'a str), usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for rec in records {
        if !query.admits(&rec.component, rec.timestamp) {
            continue;
        }
        let start = bucketing.start_of(rec.timestamp);
        let slot = *index.entry((start, rec.kpi.as_str())).or_insert_with(|| {
            groups.push(Group {
                bucket_start: start,
                kpi: rec.kpi.clone(),
                component: rec.component.clone(),
                first_timestamp: rec.timestamp,
                values: RunningSummary::new(),
            });
            groups.len() - 1
        });
        groups[slot].values.push(rec.value);
    }

    groups.sort_by_key(|g| g.bucket_start);
    groups
        .into_iter()
        .filter_map(|g| {
            let summary = g.values.finish()?;
            Some(ContainerPoint {
                bucket: Bucket {
                    start: g.bucket_start,
                    label: bucketing.label(g.bucket_start),
                },
                kpi: g.kpi,
                component: g.component,
                first_timestamp: g.first_timestamp,
                count: summary.count,
                mean: summary.mean,
                max: summary.max,
                min: summary.min,
            })
        })
        .collect()
}

/// KPIs to chart: the allow-list when one is given, otherwise the first
/// `cap` distinct non-empty KPI names in point order.
pub fn select_kpis(points: &[ContainerPoint], allow: Option<&[String]>, cap: usize) -> Vec<String> {
    if let Some(allow) = allow.filter(|a| !a.is_empty()) {
        return allow.to_vec();
    }
    let mut seen = HashSet::new();
    points
        .iter()
        .map(|p| p.kpi.as_str())
        .filter(|kpi| !kpi.is_empty() && seen.insert(*kpi))
        .take(cap)
        .map(str::to_string)
        .collect()
}

/// One pivot row: a bucket and the mean of each selected KPI in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiRow {
    pub bucket: Bucket,
    /// Aligned with [`KpiFrame::kpis`]; `None` where the KPI had no samples.
    pub values: Vec<Option<f64>>,
}

impl TimeOrdered for KpiRow {
    fn timestamp(&self) -> f64 {
        self.bucket.start as f64
    }

    fn label(&self) -> &str {
        &self.bucket.label
    }
}

/// Bucket × KPI table of means.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiFrame {
    pub kpis: Vec<String>,
    pub rows: Vec<KpiRow>,
}

impl KpiFrame {
    /// Pivot `points` on `kpis`. Every bucket present in `points` gets a row.
    pub fn pivot(points: &[ContainerPoint], kpis: Vec<String>, bucketing: Bucketing) -> Self {
        let column: HashMap<&str, usize> = kpis
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_str(), i))
            .collect();
        let mut cells: BTreeMap<i64, Vec<RunningSummary>> = BTreeMap::new();
        for p in points {
            let row = cells
                .entry(p.bucket.start)
                .or_insert_with(|| vec![RunningSummary::new(); kpis.len()]);
            if let Some(&c) = column.get(p.kpi.as_str()) {
                row[c].push(p.mean);
            }
        }
        let rows = cells
            .into_iter()
            .map(|(start, row)| KpiRow {
                bucket: Bucket {
                    start,
                    label: bucketing.label(start),
                },
                values: row.iter().map(RunningSummary::mean).collect(),
            })
            .collect();
        Self { kpis, rows }
    }

    /// Flat chart rows: `time`, `timestamp`, and one field per KPI with a value.
    pub fn chart_rows(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                let mut out = Map::new();
                out.insert("time".into(), Value::from(row.bucket.label.clone()));
                out.insert("timestamp".into(), Value::from(row.bucket.start));
                for (kpi, value) in self.kpis.iter().zip(&row.values) {
                    if let Some(v) = value {
                        out.insert(kpi.clone(), Value::from(*v));
                    }
                }
                out
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::EntityFilter;
    use tl_common::RecordKind;

    fn m(timestamp: f64, cmdb_id: &str, kpi: &str, value: f64) -> ContainerMetric {
        ContainerMetric {
            timestamp,
            component: cmdb_id.to_string(),
            kpi: kpi.to_string(),
            value,
        }
    }

    fn query() -> AggregateQuery {
        AggregateQuery::new(RecordKind::MetricContainer)
    }

    #[test]
    fn two_values_same_minute_and_kpi() {
        let rows = [m(600.0, "db-1", "cpu", 10.0), m(630.0, "db-1", "cpu", 20.0)];
        let points = aggregate_containers(&rows, &query());
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert_eq!(p.mean, 15.0);
        assert_eq!(p.max, 20.0);
        assert_eq!(p.min, 10.0);
        assert_eq!(p.count, 2);
        assert_eq!(p.component, "db-1");
        assert_eq!(p.first_timestamp, 600.0);
    }

    #[test]
    fn infinity_cell_gives_infinite_mean() {
        let value = crate::coerce::number(Some("Infinity"));
        let rows = [m(600.0, "db-1", "cpu", value), m(630.0, "db-1", "cpu", 1.0)];
        let points = aggregate_containers(&rows, &query());
        let p = &points[0];
        assert_eq!(p.mean, f64::INFINITY, "got {}", p.mean);
        assert_eq!(p.max, f64::INFINITY);
        assert_eq!(p.min, 1.0);

        let frame = KpiFrame::pivot(&points, vec!["cpu".into()], query().bucketing());
        assert_eq!(frame.rows[0].values, vec![Some(f64::INFINITY)]);
    }

    #[test]
    fn one_point_per_bucket_and_kpi() {
        let rows = [
            m(0.0, "c", "cpu", 1.0),
            m(1.0, "c", "mem", 2.0),
            m(2.0, "c", "cpu", 3.0),
            m(61.0, "c", "cpu", 4.0),
        ];
        let points = aggregate_containers(&rows, &query());
        let keys: Vec<(i64, &str)> = points
            .iter()
            .map(|p| (p.bucket.start, p.kpi.as_str()))
            .collect();
        assert_eq!(keys, vec![(0, "cpu"), (0, "mem"), (60, "cpu")]);
    }

    #[test]
    fn empty_kpi_is_own_group() {
        let rows = [m(0.0, "c", "", 1.0), m(0.0, "c", "cpu", 2.0)];
        let points = aggregate_containers(&rows, &query());
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].kpi, "");
    }

    #[test]
    fn component_filter() {
        let rows = [m(0.0, "a", "cpu", 1.0), m(0.0, "b", "cpu", 9.0)];
        let q = query().with_entity(EntityFilter::only("b"));
        let points = aggregate_containers(&rows, &q);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].mean, 9.0);
    }

    #[test]
    fn group_component_is_first_seen() {
        let rows = [m(0.0, "a", "cpu", 1.0), m(1.0, "b", "cpu", 3.0)];
        let points = aggregate_containers(&rows, &query());
        assert_eq!(points[0].component, "a");
        assert_eq!(points[0].mean, 2.0);
    }

    #[test]
    fn kpi_selection_caps_and_skips_empty() {
        let rows = [
            m(0.0, "c", "", 0.0),
            m(0.0, "c", "k1", 0.0),
            m(0.0, "c", "k2", 0.0),
            m(60.0, "c", "k1", 0.0),
            m(60.0, "c", "k3", 0.0),
        ];
        let points = aggregate_containers(&rows, &query());
        assert_eq!(select_kpis(&points, None, 2), vec!["k1", "k2"]);
        let allow = vec!["k3".to_string()];
        assert_eq!(select_kpis(&points, Some(allow.as_slice()), 2), vec!["k3"]);
        let none: Vec<String> = Vec::new();
        assert_eq!(
            select_kpis(&points, Some(none.as_slice()), 5),
            vec!["k1", "k2", "k3"]
        );
    }

    #[test]
    fn pivot_has_row_per_bucket() {
        let rows = [
            m(0.0, "c", "cpu", 10.0),
            m(30.0, "c", "cpu", 20.0),
            m(0.0, "c", "mem", 5.0),
            m(60.0, "c", "disk", 1.0),
        ];
        let points = aggregate_containers(&rows, &query());
        let frame = KpiFrame::pivot(
            &points,
            vec!["cpu".into(), "mem".into()],
            Bucketing::minute(),
        );
        assert_eq!(frame.rows.len(), 2);
        assert_eq!(frame.rows[0].values, vec![Some(15.0), Some(5.0)]);
        assert_eq!(frame.rows[1].values, vec![None, None]);

        let chart = frame.chart_rows();
        assert_eq!(chart[0]["cpu"], 15.0);
        assert_eq!(chart[0]["timestamp"], 0);
        assert!(chart[1].get("cpu").is_none());
    }
}
