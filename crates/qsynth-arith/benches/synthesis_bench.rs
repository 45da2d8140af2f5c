//! Benchmarks for arithmetic synthesis, without simulation.
//!
//! Run with: cargo bench -p qsynth-arith

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qsynth_arith::{ShiftStrategy, cyclic_shift_with, mod_multiply};
use qsynth_env::Session;
use qsynth_types::QuantumVariable;

/// Session construction of `x ← a·x mod N` for growing moduli.
fn bench_mod_multiply(c: &mut Criterion) {
    let mut group = c.benchmark_group("mod_multiply");

    for (width, modulus) in [(4usize, 15u64), (6, 61), (8, 251)] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let mut s = Session::named("bench");
                let x = QuantumVariable::integer(&mut s, "x", width).unwrap();
                mod_multiply(&mut s, &x, 7, modulus, &[]).unwrap();
                black_box(s.finish().unwrap().num_ops())
            });
        });
    }

    group.finish();
}

/// Cyclic shift of 16 cells, both strategies.
fn bench_cyclic_shift(c: &mut Criterion) {
    let mut group = c.benchmark_group("cyclic_shift");

    for strategy in [ShiftStrategy::Doubling, ShiftStrategy::Naive] {
        let id = format!("{strategy:?}").to_lowercase();
        group.bench_function(id, |b| {
            b.iter(|| {
                let mut s = Session::named("bench");
                let cells: Vec<_> = (0..16)
                    .map(|i| QuantumVariable::integer(&mut s, format!("c{i}"), 4).unwrap())
                    .collect();
                let offset = QuantumVariable::integer(&mut s, "k", 4).unwrap();
                cyclic_shift_with(&mut s, &cells, &offset, strategy).unwrap();
                black_box(s.finish().unwrap().num_ops())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_mod_multiply, bench_cyclic_shift);
criterion_main!(benches);
