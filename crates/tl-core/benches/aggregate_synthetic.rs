//! Criterion benchmarks for ingest and aggregation over synthetic telemetry.
//!
//! Inputs are generated in memory so results do not depend on disk speed.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tl_common::RecordKind;
use tl_config::{AggregateConfig, IngestConfig};
use tl_core::pipeline::{load_reader, Session};

/// One day of per-second samples for eight services.
fn build_synthetic_log_csv() -> String {
    let mut out = String::from("timestamp,rr,sr,cnt,mrt,tc\n");
    for i in 0..86_400u32 {
        let svc = i % 8;
        let rr = 90.0 + ((i % 100) as f64) / 10.0;
        let mrt = 50 + (i % 250);
        out.push_str(&format!("{},{rr:.1},99.5,{},{mrt},svc-{svc}\n", 1_700_000_000 + i, i % 40));
    }
    out
}

/// Container KPIs, ten samples per minute per KPI.
fn build_synthetic_container_csv() -> String {
    let mut out = String::from("timestamp,cmdb_id,kpi_name,value\n");
    for i in 0..60_000u32 {
        let kpi = ["cpu", "mem", "disk_io", "net_rx", "net_tx"][(i % 5) as usize];
        out.push_str(&format!(
            "{},node-{},{kpi},{}\n",
            1_700_000_000 + i * 6 / 5,
            i % 3,
            (i % 977) as f64 / 7.0
        ));
    }
    out
}

fn bench_aggregate(c: &mut Criterion) {
    let ingest = IngestConfig::default();
    let logs = build_synthetic_log_csv();
    let containers = build_synthetic_container_csv();

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    group.bench_function("load_log_86k", |b| {
        b.iter(|| {
            let ds = load_reader("log_service.csv", black_box(logs.as_bytes()), &ingest)
                .expect("synthetic log should load")
                .expect("kind detected");
            black_box(ds.len());
        })
    });

    let session = Session::new(AggregateConfig::default()).with_datasets(
        [
            load_reader("log_service.csv", logs.as_bytes(), &ingest),
            load_reader("metric_container.csv", containers.as_bytes(), &ingest),
        ]
        .into_iter()
        .filter_map(|r| r.expect("synthetic input should load")),
    );

    group.bench_function("aggregate_services_day", |b| {
        let query = session.query(RecordKind::Log);
        b.iter(|| {
            let report = session.aggregate(black_box(&query)).expect("aggregate");
            black_box(report.series.len());
        })
    });

    group.bench_function("aggregate_containers_pivot", |b| {
        let query = session.query(RecordKind::MetricContainer).with_max_points(300);
        b.iter(|| {
            let report = session.aggregate(black_box(&query)).expect("aggregate");
            black_box(report.series.len());
        })
    });
    group.finish();
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
