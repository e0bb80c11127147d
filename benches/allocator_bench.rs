//! Allocator Benchmarks - Packing Throughput
//!
//! Benchmarks a full allocation pass over synthetic catalogs of
//! increasing size, plus the rule check that runs on every placement.
//!
//! Run with: cargo bench --bench allocator_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;

use lure_bundler::adapters::feeds::demo_catalog;
use lure_bundler::domain::{price_map, BundleAllocator, BundleRules, Product};

/// Deterministic catalog with a spread of prices and costs.
fn synthetic_catalog(n: usize) -> Vec<Product> {
    (0..n)
        .map(|i| {
            let step = i64::try_from(i).unwrap_or(i64::MAX);
            let usd = Decimal::new(1_200 + (step * 37) % 900, 2);
            let aud = Decimal::new(1_800 + (step * 53) % 1_300, 2);
            let cost = Decimal::new(70_000 + (step * 71) % 35_000, 2);
            Product::new(
                format!("P{i}"),
                format!("Lure {i}"),
                price_map([("USD", usd), ("AUD", aud)]),
                Some(cost),
            )
        })
        .collect()
}

/// Benchmark full allocation over catalogs of growing size.
fn bench_generate_bundles(c: &mut Criterion) {
    let allocator = BundleAllocator::new(BundleRules::default()).unwrap();
    let mut group = c.benchmark_group("generate_bundles");

    for size in [24usize, 200, 2_000] {
        let catalog = synthetic_catalog(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &catalog, |b, catalog| {
            b.iter(|| allocator.generate_bundles(black_box(catalog)));
        });
    }
    group.finish();
}

/// Benchmark the per-placement rule check on a six-lure bundle.
fn bench_rule_check(c: &mut Criterion) {
    let rules = BundleRules::default();
    let catalog = demo_catalog();
    let members: Vec<&Product> = catalog.iter().take(6).collect();

    c.bench_function("rules_check_six", |b| {
        b.iter(|| rules.is_valid(black_box(&members)));
    });
}

criterion_group!(benches, bench_generate_bundles, bench_rule_check);
criterion_main!(benches);
