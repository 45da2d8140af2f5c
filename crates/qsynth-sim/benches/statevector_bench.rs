//! Benchmarks for state-vector gate application.
//!
//! Run with: cargo bench -p qsynth-sim

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qsynth_ir::{GateKind, StandardGate};
use qsynth_sim::kernel;
use qsynth_sim::{SimulationRequest, Simulator, SimulatorConfig, Statevector};

/// One Hadamard layer, serial against the rayon pool.
fn bench_hadamard_layer(c: &mut Criterion) {
    let mut group = c.benchmark_group("hadamard_layer");

    for n in &[12usize, 16, 20] {
        let kernels: Vec<_> = (0..*n)
            .flat_map(|q| kernel::lower(&GateKind::Standard(StandardGate::H), &[q], &[]).unwrap())
            .collect();
        for parallel in [false, true] {
            let id = if parallel { "parallel" } else { "serial" };
            group.bench_with_input(BenchmarkId::new(id, n), n, |b, &n| {
                b.iter(|| {
                    let mut sv = Statevector::new(n);
                    for k in &kernels {
                        sv.apply(k, parallel);
                    }
                    black_box(sv.norm_sqr())
                });
            });
        }
    }

    group.finish();
}

/// End-to-end exact run of a GHZ circuit.
fn bench_ghz_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("ghz_run");
    let sim = Simulator::new(SimulatorConfig::default()).unwrap();

    for n in &[8u32, 14, 18] {
        let circuit = qsynth_ir::Circuit::ghz(*n).unwrap();
        group.bench_with_input(BenchmarkId::new("exact", n), &circuit, |b, circuit| {
            b.iter(|| black_box(sim.run(&SimulationRequest::new(circuit)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_hadamard_layer, bench_ghz_run);
criterion_main!(benches);
