//! End-to-end pipeline tests: files on disk → batch load → aggregation and catalog.

use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tl_common::{Error, RecordKind};
use tl_config::{AggregateConfig, IngestConfig};
use tl_core::aggregate::Series;
use tl_core::pipeline::{load_paths, Session};
use tl_core::EntityFilter;

// ============================================================================
// Fixtures
// ============================================================================

fn write(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, body).expect("write fixture");
}

/// 1020 and 1050 share the 00:17 UTC minute; 1090 falls in 00:18.
fn fixture_dir(dir: &Path) {
    write(
        dir,
        "2024_01_01/log_service.csv",
        "timestamp,rr,sr,cnt,mrt,tc\n\
         1020,90,99,10,120,svc-a\n\
         1050,95,97,12,80,svc-a\n\
         1090,50,60,1,300,svc-b\n",
    );
    write(
        dir,
        "2024_01_01/metric_container.csv",
        "timestamp,cmdb_id,kpi_name,value\n\
         1020,db-1,cpu,10\n\
         1030,db-1,cpu,20\n\
         1080,db-1,mem,5\n",
    );
    write(
        dir,
        "2024_01_01/trace_span.csv",
        "timestamp,cmdb_id,parent_id,span_id,trace_id,duration\n\
         1020000,web,,s1,t1,10\n\
         1030000,web,s1,s2,t1,30\n",
    );
    write(dir, "2024_01_01/notes.csv", "a,b\n1,2\n");
    write(dir, "2024_01_01/readme.txt", "not telemetry\n");
}

fn loaded_session(dir: &Path) -> Session {
    let report = load_paths(&[dir], &IngestConfig::default());
    Session::new(AggregateConfig::default()).with_datasets(report.datasets)
}

// ============================================================================
// Batch loading
// ============================================================================

#[test]
fn test_directory_batch_counts() {
    let dir = tempdir().unwrap();
    fixture_dir(dir.path());

    let report = load_paths(&[dir.path()], &IngestConfig::default());
    assert_eq!(report.summary.files_loaded, 3);
    assert_eq!(report.summary.files_skipped, 1, "notes.csv has no kind");
    assert_eq!(report.summary.files_failed, 0);
    assert_eq!(report.summary.rows_loaded, 8);
    assert!(report.has_warnings());

    let kinds: Vec<RecordKind> = report.files.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            RecordKind::Log,
            RecordKind::MetricContainer,
            RecordKind::TraceSpan
        ],
        "files load in sorted path order"
    );
    assert!(report
        .files
        .iter()
        .all(|f| f.date.as_deref() == Some("2024_01_01")));
}

#[test]
fn test_missing_file_is_a_failure_not_an_abort() {
    let dir = tempdir().unwrap();
    write(dir.path(), "log.csv", "timestamp,rr,sr,cnt,mrt,tc\n1,2,3,4,5,x\n");
    let missing = dir.path().join("metric_app_missing.csv");
    let present = dir.path().join("log.csv");

    let report = load_paths(&[missing.as_path(), present.as_path()], &IngestConfig::default());
    assert_eq!(report.summary.files_loaded, 1);
    assert_eq!(report.summary.files_failed, 1);
    assert_eq!(
        report.failures[0].code,
        Error::unreadable("x", "y").code()
    );
}

#[test]
fn test_header_only_file_loads_empty_with_warning() {
    let dir = tempdir().unwrap();
    write(dir.path(), "metric_app.csv", "timestamp,rr,sr,cnt,mrt,tc\n");

    let report = load_paths(&[dir.path()], &IngestConfig::default());
    assert_eq!(report.summary.files_loaded, 1);
    assert_eq!(report.summary.empty_datasets, 1);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.datasets[0].is_empty());
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_service_series_per_minute() {
    let dir = tempdir().unwrap();
    fixture_dir(dir.path());
    let session = loaded_session(dir.path());

    let report = session.aggregate(&session.query(RecordKind::Log)).unwrap();
    assert_eq!(report.records_in, 3);
    assert!(!report.downsampled);

    let rows = report.series.chart_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["time"], "1970-01-01 00:17");
    assert_eq!(rows[0]["svc-a_rr"], 92.5);
    assert_eq!(rows[0]["svc-a_mrt"], 100.0);
    assert!(rows[0].get("svc-b_rr").is_none());
    assert_eq!(rows[1]["time"], "1970-01-01 00:18");
    assert_eq!(rows[1]["svc-b_sr"], 60.0);
}

#[test]
fn test_service_series_entity_and_window() {
    let dir = tempdir().unwrap();
    fixture_dir(dir.path());
    let session = loaded_session(dir.path());

    let query = session
        .query(RecordKind::Log)
        .with_entity(EntityFilter::only("svc-b"));
    let report = session.aggregate(&query).unwrap();
    assert_eq!(report.series.len(), 1);

    let query = session.query(RecordKind::Log).with_window(1000.0, 1060.0);
    let report = session.aggregate(&query).unwrap();
    let rows = report.series.chart_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["svc-a_rr"], 92.5);
}

#[test]
fn test_metric_app_query_ignores_log_data() {
    let dir = tempdir().unwrap();
    fixture_dir(dir.path());
    let session = loaded_session(dir.path());

    let report = session
        .aggregate(&session.query(RecordKind::MetricApp))
        .unwrap();
    assert_eq!(report.records_in, 0);
    assert!(report.series.is_empty());
}

#[test]
fn test_container_frame_pivots_kpis() {
    let dir = tempdir().unwrap();
    fixture_dir(dir.path());
    let session = loaded_session(dir.path());

    let report = session
        .aggregate(&session.query(RecordKind::MetricContainer))
        .unwrap();
    let Series::Container { kpis, points, frame } = &report.series else {
        panic!("expected container series");
    };
    assert_eq!(kpis, &vec!["cpu".to_string(), "mem".to_string()]);
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].mean, 15.0);
    assert_eq!(points[0].max, 20.0);
    assert_eq!(points[0].min, 10.0);
    assert_eq!(frame.rows.len(), 2);
    assert_eq!(frame.rows[0].values, vec![Some(15.0), None]);
    assert_eq!(frame.rows[1].values, vec![None, Some(5.0)]);

    let only_mem = session
        .query(RecordKind::MetricContainer)
        .with_kpis(["mem"]);
    let report = session.aggregate(&only_mem).unwrap();
    let rows = report.series.chart_rows();
    assert!(rows[0].get("cpu").is_none());
    assert_eq!(rows[1]["mem"], 5.0);
}

#[test]
fn test_trace_series_uses_millisecond_timestamps() {
    let dir = tempdir().unwrap();
    fixture_dir(dir.path());
    let session = loaded_session(dir.path());

    let report = session
        .aggregate(&session.query(RecordKind::TraceSpan))
        .unwrap();
    let rows = report.series.chart_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["time"], "1970-01-01 00:17");
    assert_eq!(rows[0]["count"], 2);
    assert_eq!(rows[0]["mean_duration"], 20.0);
    assert_eq!(rows[0]["max_duration"], 30.0);
    assert_eq!(rows[0]["min_duration"], 10.0);
}

#[test]
fn test_long_series_is_downsampled_to_budget() {
    let dir = tempdir().unwrap();
    let mut body = String::from("timestamp,rr,sr,cnt,mrt,tc\n");
    for minute in 0..500 {
        body.push_str(&format!("{},{},100,1,10,svc\n", minute * 60, minute % 100));
    }
    write(dir.path(), "metric_app.csv", &body);
    let session = loaded_session(dir.path());

    let query = session.query(RecordKind::MetricApp).with_max_points(50);
    let report = session.aggregate(&query).unwrap();
    assert!(report.downsampled);
    assert_eq!(report.rows_before_sampling, 500);
    assert!(report.series.len() <= 50);

    let rows = report.series.chart_rows();
    assert_eq!(rows[0]["time"], "1970-01-01 00:00");
    assert_eq!(rows.last().unwrap()["time"], "1970-01-01 08:19");
}

#[test]
fn test_record_and_query_kinds_are_not_aggregatable() {
    let session = Session::default();
    for kind in [RecordKind::Record, RecordKind::Query] {
        let err = session.aggregate(&session.query(kind)).unwrap_err();
        assert!(matches!(err, Error::NotAggregatable(k) if k == kind));
    }
}

#[test]
fn test_cache_key_is_stable_across_sessions() {
    let a = Session::default().query(RecordKind::Log).with_window(1.0, 2.0);
    let b = Session::default().query(RecordKind::Log).with_window(1.0, 2.0);
    assert_eq!(a.cache_key().unwrap(), b.cache_key().unwrap());
    let c = b.with_entity(EntityFilter::only("svc-a"));
    assert_ne!(a.cache_key().unwrap(), c.cache_key().unwrap());
}

// ============================================================================
// Catalog
// ============================================================================

#[test]
fn test_catalog_snapshot() {
    let dir = tempdir().unwrap();
    fixture_dir(dir.path());
    let session = loaded_session(dir.path());

    let snapshot = session.catalog().snapshot();
    assert_eq!(snapshot.services, vec!["svc-a", "svc-b"]);
    assert_eq!(snapshot.components, vec!["db-1", "web"]);
    assert_eq!(snapshot.kpis, vec!["cpu", "mem"]);
    assert_eq!(snapshot.dates, vec!["2024_01_01"]);
    let range = snapshot.time_range.unwrap();
    assert_eq!(range.start, 1020.0);
    assert_eq!(range.end, 1090.0);
    assert_eq!(snapshot.statistics.total_files, 3);
    assert_eq!(snapshot.statistics.total_rows, 8);
}
