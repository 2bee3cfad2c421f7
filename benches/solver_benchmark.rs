//! Allocation Solver Benchmarks
//!
//! Benchmarks covering:
//! - Shift-and-clip solve cost against consumer-set size
//! - Shortage vs surplus vs exact-match totals
//! - Full-horizon planning throughput

use atlas_allocation::allocator::{allocate, plan_horizon};
use atlas_allocation::types::{ConsumerId, ForecastPoint};
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;

/// Create a forecast map with N consumers and varied magnitudes
fn create_forecasts(count: usize) -> BTreeMap<ConsumerId, f64> {
    (0..count)
        .map(|i| {
            let forecast = 5.0 + (i % 40) as f64 * 2.5;
            (ConsumerId::new(format!("store-{:04}", i)), forecast)
        })
        .collect()
}

/// Create aligned 7-day forecast series for N consumers
fn create_series(count: usize) -> BTreeMap<ConsumerId, Vec<ForecastPoint>> {
    let start: NaiveDate = "2024-06-01".parse().unwrap();
    (0..count)
        .map(|i| {
            let base = 5.0 + (i % 40) as f64 * 2.5;
            let points = (0..7)
                .map(|d| ForecastPoint::new(start + Duration::days(d), base + d as f64))
                .collect();
            (ConsumerId::new(format!("store-{:04}", i)), points)
        })
        .collect()
}

fn bench_solver_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver_size");

    for size in [10usize, 100, 1000] {
        let forecasts = create_forecasts(size);
        let demand: f64 = forecasts.values().sum();

        group.bench_with_input(BenchmarkId::new("shortage", size), &size, |b, _| {
            b.iter(|| allocate(black_box(demand * 0.6), black_box(&forecasts)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("surplus", size), &size, |b, _| {
            b.iter(|| allocate(black_box(demand * 1.4), black_box(&forecasts)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("exact", size), &size, |b, _| {
            b.iter(|| allocate(black_box(demand), black_box(&forecasts)).unwrap())
        });
    }

    group.finish();
}

fn bench_horizon(c: &mut Criterion) {
    let mut group = c.benchmark_group("horizon");

    for size in [10usize, 100, 1000] {
        let series = create_series(size);
        group.bench_with_input(BenchmarkId::new("seven_days", size), &size, |b, _| {
            b.iter(|| plan_horizon(black_box(500.0), black_box(&series)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_solver_sizes, bench_horizon);
criterion_main!(benches);
