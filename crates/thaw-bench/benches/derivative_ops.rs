//! Criterion benchmarks for chain-rule derivative propagation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use thaw_bench::soil_state;
use thaw_core::FieldKey;

/// `d(energy)/d(pressure)` through saturation and water content, rebuilt
/// after every primary write.
fn bench_derivative_after_write_1k(c: &mut Criterion) {
    let mut state = soil_state(1_000).unwrap();
    let pressure = FieldKey::new("pressure");
    let energy = FieldKey::new("energy");
    let mut p = 0.0;

    c.bench_function("derivative_after_write_1k", |b| {
        b.iter(|| {
            p = 1.0 - p;
            state.fill_primary(&pressure, p).unwrap();
            let d = state.derivative_field(&energy, &pressure).unwrap();
            black_box(d.norm_inf());
        });
    });
}

/// Cached derivative: only the epoch checks run.
fn bench_derivative_cached_1k(c: &mut Criterion) {
    let mut state = soil_state(1_000).unwrap();
    let temperature = FieldKey::new("temperature");
    let energy = FieldKey::new("energy");
    state.derivative(&energy, &temperature).unwrap();

    c.bench_function("derivative_cached_1k", |b| {
        b.iter(|| {
            black_box(state.derivative(&energy, &temperature).unwrap());
        });
    });
}

/// Structurally zero derivative: no evaluator is asked for a partial.
fn bench_derivative_independent_1k(c: &mut Criterion) {
    let mut state = soil_state(1_000).unwrap();
    let porosity = FieldKey::new("porosity");
    let rel = FieldKey::new("relative_permeability");

    c.bench_function("derivative_independent_1k", |b| {
        b.iter(|| {
            black_box(state.derivative(&rel, &porosity).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_derivative_after_write_1k,
    bench_derivative_cached_1k,
    bench_derivative_independent_1k
);
criterion_main!(benches);
