//! Benchmarks for circuit construction and allocation.
//!
//! Run with: cargo bench -p qsynth-ir

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qsynth_ir::{Circuit, QubitAllocator, QubitId};

/// Allocate and release ancillae in a tight loop, the pattern of nested
/// conjugations.
fn bench_allocator_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocator_churn");

    for width in &[4u32, 16, 64] {
        group.bench_with_input(BenchmarkId::new("alloc_release", width), width, |b, &w| {
            b.iter(|| {
                let mut alloc = QubitAllocator::new(None);
                let base = alloc.allocate(w).unwrap();
                for _ in 0..32 {
                    let anc = alloc.allocate(black_box(w / 2 + 1)).unwrap();
                    alloc.deallocate(&anc).unwrap();
                }
                black_box(base)
            });
        });
    }

    group.finish();
}

/// Append a GHZ ladder.
fn bench_gate_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate_append");

    for n in &[10u32, 50, 100] {
        group.bench_with_input(BenchmarkId::new("ghz", n), n, |b, &n| {
            b.iter(|| black_box(Circuit::ghz(n).unwrap()));
        });
    }

    group.finish();
}

/// Depth of a layered brickwork circuit.
fn bench_circuit_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_depth");

    for num_qubits in &[5u32, 20, 50] {
        let mut circuit = Circuit::with_size("bench", *num_qubits, 0);
        for _layer in 0..5 {
            for i in 0..*num_qubits {
                circuit.h(QubitId(i)).unwrap();
            }
            for i in (0..*num_qubits - 1).step_by(2) {
                circuit.cx(QubitId(i), QubitId(i + 1)).unwrap();
            }
        }

        group.bench_with_input(
            BenchmarkId::new("depth", num_qubits),
            &circuit,
            |b, circuit| {
                b.iter(|| black_box(circuit.depth()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_allocator_churn,
    bench_gate_append,
    bench_circuit_depth,
);

criterion_main!(benches);
