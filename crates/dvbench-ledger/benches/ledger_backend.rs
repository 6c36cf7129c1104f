//! Criterion benchmarks for the ledger backends.
//!
//! These measure the flush path that runs once per step (or once per
//! record) in every workflow.

use std::collections::BTreeMap;

use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use dvbench_ledger::{JsonlLedger, Ledger, LedgerBackend, SqliteLedger};
use dvbench_types::{LedgerRow, RunId, Technology, WorkflowKind};

fn sample_row(step: u32) -> LedgerRow {
    let mut extra = BTreeMap::new();
    extra.insert("seed".to_string(), serde_json::json!(0));
    extra.insert("version_git".to_string(), serde_json::json!("git version 2.43.0"));
    LedgerRow {
        timestamp: Utc::now(),
        run_id: RunId::new("bench-run"),
        workflow: WorkflowKind::Append,
        technology: Technology::S3,
        operation: "s3-upload".into(),
        label: "bench".into(),
        merged: true,
        filename: "append.parquet".into(),
        step,
        file_bytes: 1 << 20,
        row_count: 10_000,
        time_seconds: 1.25,
        bytes_sent: 1 << 20,
        bytes_recv: 4096,
        bytes_sent_1s: 12,
        bytes_recv_1s: 40,
        error: String::new(),
        extra,
    }
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger/append");

    for batch in [1_u32, 8, 64] {
        let rows: Vec<LedgerRow> = (0..batch).map(sample_row).collect();

        group.bench_with_input(BenchmarkId::new("sqlite", batch), &rows, |b, rows| {
            let backend = SqliteLedger::in_memory().unwrap();
            b.iter(|| backend.append(rows).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("jsonl", batch), &rows, |b, rows| {
            let dir = tempfile::tempdir().unwrap();
            let backend = JsonlLedger::open(&dir.path().join("stats.jsonl")).unwrap();
            b.iter(|| backend.append(rows).unwrap());
        });
    }

    group.finish();
}

fn bench_read_latest_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger/read_latest_run");

    group.bench_function("sqlite_1000_rows", |b| {
        let mut ledger = Ledger::in_memory().unwrap();
        for step in 0..1000 {
            ledger.append(sample_row(step));
        }
        ledger.flush().unwrap();
        b.iter(|| ledger.read_latest_run().unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_append, bench_read_latest_run);
criterion_main!(benches);
