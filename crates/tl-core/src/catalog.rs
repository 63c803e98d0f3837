//! Read-only facts over a session's datasets.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tl_common::RecordKind;

use crate::pipeline::LoadedDataset;

/// Earliest and latest record time, in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

/// File and row counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_files: u64,
    pub total_rows: u64,
    pub rows_by_kind: BTreeMap<RecordKind, u64>,
}

/// Everything the catalog knows, in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSnapshot {
    pub services: Vec<String>,
    pub components: Vec<String>,
    pub kpis: Vec<String>,
    pub dates: Vec<String>,
    pub time_range: Option<TimeRange>,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    datasets: &'a [LoadedDataset],
}

impl<'a> Catalog<'a> {
    pub fn new(datasets: &'a [LoadedDataset]) -> Self {
        Self { datasets }
    }

    /// Sorted distinct non-empty service ids over `log` and `metric_app`
    /// datasets, or over `only` when given.
    pub fn services(&self, only: Option<RecordKind>) -> Vec<String> {
        let mut set = BTreeSet::new();
        for ds in self.datasets {
            if only.is_some_and(|k| k != ds.kind) {
                continue;
            }
            if let Some(rows) = ds.records.service_kpis() {
                set.extend(rows.iter().map(|r| r.service.as_str()));
            }
        }
        sorted_non_empty(set)
    }

    /// Sorted distinct non-empty component ids over container and trace data.
    pub fn components(&self) -> Vec<String> {
        let mut set = BTreeSet::new();
        for ds in self.datasets {
            if let Some(rows) = ds.records.container_metrics() {
                set.extend(rows.iter().map(|r| r.component.as_str()));
            }
            if let Some(spans) = ds.records.trace_spans() {
                set.extend(spans.iter().map(|s| s.component.as_str()));
            }
        }
        sorted_non_empty(set)
    }

    pub fn kpis(&self) -> Vec<String> {
        let mut set = BTreeSet::new();
        for ds in self.datasets {
            if let Some(rows) = ds.records.container_metrics() {
                set.extend(rows.iter().map(|r| r.kpi.as_str()));
            }
        }
        sorted_non_empty(set)
    }

    pub fn dates(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .datasets
            .iter()
            .filter_map(|ds| ds.date.as_deref())
            .collect();
        sorted_non_empty(set)
    }

    /// Span of record times. Zero timestamps are treated as missing for
    /// service and container data; trace times are converted from ms.
    pub fn time_range(&self) -> Option<TimeRange> {
        let mut range: Option<TimeRange> = None;
        let mut see = |t: f64| {
            if !t.is_finite() {
                return;
            }
            range = Some(match range {
                None => TimeRange { start: t, end: t },
                Some(r) => TimeRange {
                    start: r.start.min(t),
                    end: r.end.max(t),
                },
            });
        };
        for ds in self.datasets {
            if let Some(rows) = ds.records.service_kpis() {
                rows.iter().map(|r| r.timestamp).filter(|&t| t != 0.0).for_each(&mut see);
            } else if let Some(rows) = ds.records.container_metrics() {
                rows.iter().map(|r| r.timestamp).filter(|&t| t != 0.0).for_each(&mut see);
            } else if let Some(spans) = ds.records.trace_spans() {
                spans.iter().map(|s| s.timestamp_secs()).for_each(&mut see);
            }
        }
        range
    }

    /// Counts, optionally restricted to one kind and/or one date label.
    pub fn statistics(&self, kind: Option<RecordKind>, date: Option<&str>) -> Statistics {
        let mut stats = Statistics::default();
        for ds in self.datasets {
            if kind.is_some_and(|k| k != ds.kind) {
                continue;
            }
            if date.is_some_and(|d| ds.date.as_deref() != Some(d)) {
                continue;
            }
            let rows = ds.len() as u64;
            stats.total_files += 1;
            stats.total_rows += rows;
            *stats.rows_by_kind.entry(ds.kind).or_default() += rows;
        }
        stats
    }

    /// Indices of records in `dataset` with any cell containing `text`,
    /// ignoring case. An empty needle matches every record.
    pub fn search(dataset: &LoadedDataset, text: &str) -> Vec<usize> {
        let needle = text.to_lowercase();
        (0..dataset.len())
            .filter(|&i| {
                dataset.records.cells(i).is_some_and(|cells| {
                    cells.iter().any(|c| c.to_lowercase().contains(&needle))
                })
            })
            .collect()
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            services: self.services(None),
            components: self.components(),
            kpis: self.kpis(),
            dates: self.dates(),
            time_range: self.time_range(),
            statistics: self.statistics(None, None),
        }
    }
}

fn sorted_non_empty(set: BTreeSet<&str>) -> Vec<String> {
    set.into_iter()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
