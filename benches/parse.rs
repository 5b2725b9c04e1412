//! Benchmarks for catalog line parsing
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keyspaces_import::{parse_records, Record};

fn catalog(lines: usize) -> String {
    (0..lines)
        .map(|i| {
            format!(
                "978{i:010};Title number {i};Author {};{};{}\n",
                i % 97,
                100 + i % 900,
                1950 + i % 70
            )
        })
        .collect()
}

fn benchmark_single_line(c: &mut Criterion) {
    c.bench_function("record_from_line", |b| {
        b.iter(|| {
            let record = Record::from_line(
                black_box("9780135957059;Effective Java;Joshua Bloch;412;2017"),
                1,
            );
            black_box(record).unwrap();
        })
    });
}

fn benchmark_catalog(c: &mut Criterion) {
    let input = catalog(10_000);

    c.bench_function("parse_records_10k", |b| {
        b.iter(|| {
            let parsed = parse_records(black_box(input.as_bytes()))
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
            black_box(parsed.len());
        })
    });
}

criterion_group!(benches, benchmark_single_line, benchmark_catalog);
criterion_main!(benches);
