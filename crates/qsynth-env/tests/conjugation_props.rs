//! Property tests for automatic uncomputation.

use proptest::prelude::*;
use qsynth_env::{EnvResult, Session, inverse_instruction};
use qsynth_ir::{ParameterBindings, QubitId};
use qsynth_sim::{Simulator, SimulatorConfig, Statevector};

const WIDTH: u32 = 3;

/// `(kind, a, b, angle)`; two-qubit kinds fall back to a one-qubit gate when
/// `a == b`.
type Op = (u8, u32, u32, f64);

fn op_strategy() -> impl Strategy<Value = Op> {
    (0u8..8, 0u32..WIDTH, 0u32..WIDTH, -3.0f64..3.0)
}

fn apply_op(s: &mut Session, q: &[QubitId], (kind, a, b, angle): Op) -> EnvResult<()> {
    let (a, b) = (q[a as usize], q[b as usize]);
    match kind {
        0 => s.h(a),
        1 => s.t(a),
        2 => s.s(a),
        3 => s.rx(angle, a),
        4 => s.ry(angle, a),
        5 => s.rz(angle, a),
        6 if a != b => s.cx(a, b),
        6 => s.x(a),
        _ if a != b => s.cp(angle, a, b),
        _ => s.p(angle, a),
    }
}

fn prepared() -> (Session, Vec<QubitId>) {
    let mut s = Session::named("prop");
    let q = s.allocate(WIDTH, "q").unwrap();
    s.h(q[0]).unwrap();
    s.ry(0.4, q[1]).unwrap();
    s.cx(q[0], q[2]).unwrap();
    (s, q)
}

fn state(s: &Session) -> Statevector {
    Simulator::new(SimulatorConfig::default())
        .unwrap()
        .statevector(s.circuit(), &ParameterBindings::new())
        .unwrap()
}

/// One conjugation per entry of `levels`, each allocating that many compute
/// ancillae and opening the next level in its action.
fn nest(s: &mut Session, control: QubitId, levels: &[u32]) -> EnvResult<()> {
    let Some((&count, rest)) = levels.split_first() else {
        return Ok(());
    };
    s.conjugate(
        "level",
        |s| -> EnvResult<Vec<QubitId>> {
            let anc = s.allocate(count, "anc")?;
            for &a in &anc {
                s.cx(control, a)?;
            }
            Ok(anc)
        },
        |s, anc| nest(s, anc[0], rest),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn nested_conjugations_return_every_ancilla(levels in prop::collection::vec(1u32..4, 1..6)) {
        let mut s = Session::named("nest");
        let base = s.allocate(1, "base").unwrap()[0];
        s.x(base).unwrap();
        let total: u32 = levels.iter().sum();

        nest(&mut s, base, &levels).unwrap();
        prop_assert_eq!(s.open_environments(), 0);
        prop_assert_eq!(s.allocator().num_allocated(), 1);
        prop_assert_eq!(s.allocator().num_free(), total);
        prop_assert_eq!(s.allocator().pool_size(), 1 + total);
        prop_assert_eq!(s.allocator().peak(), 1 + total);

        // A second pass reuses the reclaimed ids instead of growing the pool.
        nest(&mut s, base, &levels).unwrap();
        prop_assert_eq!(s.allocator().num_allocated(), 1);
        prop_assert_eq!(s.allocator().num_free(), total);
        prop_assert_eq!(s.allocator().pool_size(), 1 + total);
        prop_assert_eq!(s.allocator().peak(), 1 + total);
        prop_assert_eq!(s.allocate(1, "next").unwrap()[0], QubitId(1));
    }

    #[test]
    fn conjugation_with_empty_action_is_identity(ops in prop::collection::vec(op_strategy(), 0..12)) {
        let (reference, _) = prepared();
        let (mut s, q) = prepared();
        s.conjugate(
            "prop",
            |s| -> EnvResult<()> {
                for &op in &ops {
                    apply_op(s, &q, op)?;
                }
                Ok(())
            },
            |_, ()| Ok::<(), qsynth_env::EnvError>(()),
        )
        .unwrap();

        prop_assert_eq!(s.circuit().num_ops(), reference.circuit().num_ops() + 2 * ops.len());
        let fidelity = state(&s).fidelity(&state(&reference));
        prop_assert!((fidelity - 1.0).abs() < 1e-9, "fidelity {}", fidelity);
    }

    #[test]
    fn body_then_inverse_is_identity(ops in prop::collection::vec(op_strategy(), 1..12)) {
        let (reference, _) = prepared();
        let (mut s, q) = prepared();
        for &op in &ops {
            apply_op(&mut s, &q, op).unwrap();
        }
        s.invert(|s| -> EnvResult<()> {
            for &op in &ops {
                apply_op(s, &q, op)?;
            }
            Ok(())
        })
        .unwrap();

        let fidelity = state(&s).fidelity(&state(&reference));
        prop_assert!((fidelity - 1.0).abs() < 1e-9, "fidelity {}", fidelity);
    }

    #[test]
    fn uncompute_is_reversed_adjoint(ops in prop::collection::vec(op_strategy(), 1..10)) {
        let (mut s, q) = prepared();
        let start = s.circuit().num_ops();
        s.conjugate(
            "prop",
            |s| -> EnvResult<()> {
                for &op in &ops {
                    apply_op(s, &q, op)?;
                }
                Ok(())
            },
            |_, ()| Ok::<(), qsynth_env::EnvError>(()),
        )
        .unwrap();

        let emitted = &s.circuit().instructions()[start..];
        let (compute, uncompute) = emitted.split_at(ops.len());
        for (forward, backward) in compute.iter().rev().zip(uncompute) {
            let expected = inverse_instruction(forward).unwrap();
            prop_assert_eq!(&expected, backward);
        }
    }
}
