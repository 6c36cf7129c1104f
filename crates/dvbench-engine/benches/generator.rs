//! Criterion benchmarks for dataset generation and serialization.
//!
//! Generation and export sit outside the timed operation window, but they
//! bound how fast a many-step run can iterate.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use dvbench_engine::generator::{export, generate, BlogRowGenerator};

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generator/generate");

    for rows in [1_000_usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("numeric", rows), &rows, |b, &rows| {
            b.iter(|| generate(42, rows, true).unwrap());
        });
    }
    for rows in [100_usize, 1_000] {
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("realistic", rows), &rows, |b, &rows| {
            b.iter(|| generate(42, rows, false).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("blog", rows), &rows, |b, &rows| {
            let mut blog = BlogRowGenerator::new(42);
            b.iter(|| blog.generate(rows).unwrap());
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("generator/export");
    let dir = tempfile::tempdir().unwrap();
    let dataset = generate(7, 10_000, true).unwrap();

    for suffix in ["parquet", "csv"] {
        let path = dir.path().join(format!("bench.{suffix}"));
        group.bench_function(suffix, |b| {
            b.iter(|| export(&dataset, &path).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate, bench_export);
criterion_main!(benches);
