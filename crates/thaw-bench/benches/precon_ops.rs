//! Criterion benchmarks for the coupled-cells preconditioner.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use thaw_bench::{coupled_preconditioner, soil_state, STEP};
use thaw_precon::InverseOperator;

/// Refresh the coupling blocks and refactor the face Schur complement.
fn bench_coupled_update_200(c: &mut Criterion) {
    let mut state = soil_state(200).unwrap();
    let mut pc = coupled_preconditioner(&mut state).unwrap();

    c.bench_function("coupled_update_200", |b| {
        b.iter(|| {
            pc.update(&mut state, STEP).unwrap();
            black_box(pc.is_ready());
        });
    });
}

/// One application of the factored coupled inverse.
fn bench_coupled_apply_inverse_200(c: &mut Criterion) {
    let mut state = soil_state(200).unwrap();
    let pc = coupled_preconditioner(&mut state).unwrap();
    let mut r = pc.zero_vector();
    r.put_scalar(1.0);
    let mut x = pc.zero_vector();

    c.bench_function("coupled_apply_inverse_200", |b| {
        b.iter(|| {
            pc.apply_inverse(&r, &mut x).unwrap();
            black_box(x.norm_inf());
        });
    });
}

criterion_group!(
    benches,
    bench_coupled_update_200,
    bench_coupled_apply_inverse_200
);
criterion_main!(benches);
