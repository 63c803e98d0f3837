//! Per-minute, per-service KPI means for the `log` and `metric_app` kinds.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tl_math::RunningSummary;

use super::bucket::Bucket;
use super::AggregateQuery;
use crate::downsample::TimeOrdered;
use crate::records::ServiceKpi;

/// Means of one service's samples within one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    pub service: String,
    pub count: u64,
    pub response_rate: f64,
    pub success_rate: f64,
    pub mean_response_time: f64,
}

/// One bucket of service KPIs. `services` follows the series' service order
/// and only lists services that had samples in this bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServicePoint {
    pub bucket: Bucket,
    pub services: Vec<ServiceStats>,
}

impl ServicePoint {
    pub fn service(&self, name: &str) -> Option<&ServiceStats> {
        self.services.iter().find(|s| s.service == name)
    }

    /// Flat chart row: `time` plus `<service>_rr`, `<service>_sr`, `<service>_mrt`.
    pub fn chart_row(&self) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("time".into(), Value::from(self.bucket.label.clone()));
        for s in &self.services {
            row.insert(format!("{}_rr", s.service), Value::from(s.response_rate));
            row.insert(format!("{}_sr", s.service), Value::from(s.success_rate));
            row.insert(
                format!("{}_mrt", s.service),
                Value::from(s.mean_response_time),
            );
        }
        row
    }
}

impl TimeOrdered for ServicePoint {
    fn timestamp(&self) -> f64 {
        self.bucket.start as f64
    }

    fn label(&self) -> &str {
        &self.bucket.label
    }
}

#[derive(Default)]
struct ServiceAcc {
    rr: RunningSummary,
    sr: RunningSummary,
    mrt: RunningSummary,
}

impl ServiceAcc {
    fn push(&mut self, rec: &ServiceKpi) {
        self.rr.push(rec.response_rate);
        self.sr.push(rec.success_rate);
        self.mrt.push(rec.mean_response_time);
    }

    fn finish(&self, service: &str) -> ServiceStats {
        ServiceStats {
            service: service.to_string(),
            count: self.rr.count(),
            response_rate: self.rr.mean().unwrap_or_default(),
            success_rate: self.sr.mean().unwrap_or_default(),
            mean_response_time: self.mrt.mean().unwrap_or_default(),
        }
    }
}

/// Services in series order, and one point per non-empty bucket, ascending.
///
/// The series covers the first `service_cap` distinct services encountered
/// after filtering. A bucket whose samples all belong to services beyond the
/// cap still yields a point with no services.
pub fn aggregate_services<'a>(
    records: impl IntoIterator<Item = &'a ServiceKpi>,
    query: &AggregateQuery,
) -> (Vec<String>, Vec<ServicePoint>) {
    let bucketing = query.bucketing();
    let mut services: Vec<String> = Vec::new();
    let mut buckets: BTreeMap<i64, BTreeMap<usize, ServiceAcc>> = BTreeMap::new();

    for rec in records {
        if !query.admits(&rec.service, rec.timestamp) {
            continue;
        }
        let slot = match services.iter().position(|s| *s == rec.service) {
            Some(i) => Some(i),
            None if services.len() < query.service_cap => {
                services.push(rec.service.clone());
                Some(services.len() - 1)
            }
            None => None,
        };
        let bucket = buckets.entry(bucketing.start_of(rec.timestamp)).or_default();
        if let Some(i) = slot {
            bucket.entry(i).or_default().push(rec);
        }
    }

    let points = buckets
        .into_iter()
        .map(|(start, accs)| ServicePoint {
            bucket: Bucket {
                start,
                label: bucketing.label(start),
            },
            services: accs
                .iter()
                .map(|(&i, acc)| acc.finish(&services[i]))
                .collect(),
        })
        .collect();
    (services, points)
}
