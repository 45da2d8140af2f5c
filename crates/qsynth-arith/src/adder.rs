//! Adders.
//!
//! [`add_constant`] and [`add`] work in the Fourier basis: the target is
//! transformed, phases are added, and the conjugation undoes the transform.
//! The out-of-place [`ripple_add`] is a classical carry chain on ancillae;
//! [`lookahead_add`] computes the same carries with a parallel prefix.
//! [`gidney_add`] is an in-place ripple-carry adder whose carries are
//! temporary logical ANDs, erased by measurement instead of by a mirrored
//! Toffoli chain.

use std::f64::consts::PI;

use qsynth_env::{EnvResult, Session};
use qsynth_ir::{QubitId, StandardGate};
use qsynth_types::{Decoder, QuantumVariable};
use tracing::debug;

use crate::error::{SynthResult, SynthesisError, check_same_width, check_width};
use crate::fourier::{phase_add_constant, transform};

/// `target += c mod 2^n`.
///
/// Negative `c` subtracts.
pub fn add_constant(session: &mut Session, target: &QuantumVariable, c: i64) -> SynthResult<()> {
    check_width("add_constant", target.width())?;
    debug!(width = target.width(), constant = c, "add constant");
    let reg = target.qubits();
    session.conjugate(
        "add_constant",
        |s| transform(s, reg),
        |s, ()| phase_add_constant(s, reg, c),
    )
}

/// `target += source mod 2^n` (Draper adder).
pub fn add(session: &mut Session, target: &QuantumVariable, source: &QuantumVariable) -> SynthResult<()> {
    check_width("add", target.width())?;
    check_same_width("add", target.width(), source.width())?;
    debug!(width = target.width(), "add");
    let (t_reg, s_reg) = (target.qubits(), source.qubits());
    session.conjugate(
        "add",
        |s| transform(s, t_reg),
        |s, ()| {
            for (t, &tq) in t_reg.iter().enumerate() {
                for k in (0..=t).rev() {
                    s.cp(PI / 2f64.powi((t - k) as i32), s_reg[k], tq)?;
                }
            }
            Ok(())
        },
    )
}

/// Out-of-place `a + b` into a fresh variable of width `n + 1`.
///
/// The carries live in ancillae computed by a conjugation and cleared at its
/// exit; the sum is exported to the caller's environment.
pub fn ripple_add(
    session: &mut Session,
    a: &QuantumVariable,
    b: &QuantumVariable,
) -> SynthResult<QuantumVariable> {
    let n = a.width();
    check_width("ripple_add", n)?;
    check_same_width("ripple_add", n, b.width())?;
    debug!(width = n, "ripple add");
    let (a, b) = (a.qubits(), b.qubits());

    session.conjugate(
        "ripple_add",
        |s| -> SynthResult<Vec<QubitId>> {
            // carry[i] is the carry into bit i + 1.
            let carry = s.allocate(n as u32, "carry")?;
            s.ccx(a[0], b[0], carry[0])?;
            for i in 1..n {
                s.ccx(a[i], b[i], carry[i])?;
                s.ccx(a[i], carry[i - 1], carry[i])?;
                s.ccx(b[i], carry[i - 1], carry[i])?;
            }
            Ok(carry)
        },
        |s, carry| {
            let sum = s.allocate(n as u32 + 1, "sum")?;
            for i in 0..n {
                s.cx(a[i], sum[i])?;
                s.cx(b[i], sum[i])?;
                if i > 0 {
                    s.cx(carry[i - 1], sum[i])?;
                }
            }
            s.cx(carry[n - 1], sum[n])?;
            s.export(&sum)?;
            Ok(QuantumVariable::from_qubits(
                "sum",
                sum,
                Decoder::Integer { signed: false },
            )?)
        },
    )
}

/// Out-of-place `a + b` like [`ripple_add`], with the carries computed by a
/// Kogge-Stone parallel prefix.
///
/// Carry depth is logarithmic in the width, paid for with `O(n log n)`
/// compute ancillae. While the conjugation is open, `b` holds the propagate
/// bits `a ^ b`.
pub fn lookahead_add(
    session: &mut Session,
    a: &QuantumVariable,
    b: &QuantumVariable,
) -> SynthResult<QuantumVariable> {
    let n = a.width();
    check_width("lookahead_add", n)?;
    check_same_width("lookahead_add", n, b.width())?;
    debug!(width = n, "lookahead add");
    let (a, b) = (a.qubits(), b.qubits());

    session.conjugate(
        "lookahead_add",
        |s| -> SynthResult<Vec<QubitId>> {
            let mut generate = s.allocate(n as u32, "generate")?;
            for i in 0..n {
                s.ccx(a[i], b[i], generate[i])?;
                s.cx(a[i], b[i])?;
            }
            let mut propagate = b.to_vec();

            // After the round with span d, generate[i] covers bits
            // max(0, i + 1 - 2d)..=i. Generate and propagate of one group
            // exclude each other, so the OR is a CX. Every gate of a round
            // targets a fresh qubit, so gates are emitted layer by layer.
            let mut d = 1;
            while d < n {
                let fresh = s.allocate((n - d) as u32, "generate")?;
                let mut next = generate.clone();
                for (i, &g) in (d..n).zip(&fresh) {
                    s.cx(generate[i], g)?;
                }
                for (i, &g) in (d..n).zip(&fresh) {
                    s.ccx(propagate[i], generate[i - d], g)?;
                    next[i] = g;
                }
                // Only groups that a later round extends need a propagate bit.
                if 2 * d < n {
                    let fresh = s.allocate((n - 2 * d) as u32, "propagate")?;
                    let mut widened = propagate.clone();
                    // propagate[i] also feeds bit i + d: split by block parity.
                    for parity in [0, 1] {
                        for (i, &p) in (2 * d..n).zip(&fresh) {
                            if (i / d) % 2 == parity {
                                s.ccx(propagate[i], propagate[i - d], p)?;
                                widened[i] = p;
                            }
                        }
                    }
                    propagate = widened;
                }
                generate = next;
                d *= 2;
            }
            // generate[i] is now the carry into bit i + 1.
            Ok(generate)
        },
        |s, carry| {
            let sum = s.allocate(n as u32 + 1, "sum")?;
            for i in 0..n {
                s.cx(b[i], sum[i])?;
                if i > 0 {
                    s.cx(carry[i - 1], sum[i])?;
                }
            }
            s.cx(carry[n - 1], sum[n])?;
            s.export(&sum)?;
            Ok(QuantumVariable::from_qubits(
                "sum",
                sum,
                Decoder::Integer { signed: false },
            )?)
        },
    )
}

/// `target ^= a & b` for a target in |0>, using four T gates.
fn and_compute(s: &mut Session, a: QubitId, b: QubitId, target: QubitId) -> SynthResult<()> {
    s.h(target)?;
    s.t(target)?;
    s.cx(a, target)?;
    s.cx(b, target)?;
    s.cx(target, a)?;
    s.cx(target, b)?;
    s.apply(StandardGate::Tdg, &[a])?;
    s.apply(StandardGate::Tdg, &[b])?;
    s.t(target)?;
    s.cx(target, a)?;
    s.cx(target, b)?;
    s.h(target)?;
    s.s(target)?;
    Ok(())
}

/// Erase `target = a & b` by an X-basis measurement.
///
/// Outcome 1 leaves a `(-1)^(a·b)` phase, fixed by a CZ, and the target in
/// |1>, reset by an X.
fn and_uncompute(s: &mut Session, a: QubitId, b: QubitId, target: QubitId) -> SynthResult<()> {
    s.h(target)?;
    let m = s.measure(target)?;
    s.control_classical(&[m], 1, |s| -> EnvResult<()> {
        s.cz(a, b)?;
        s.x(target)
    })?;
    Ok(())
}

/// `b ^= a`, or `b ^= c & a` through a temporary AND in `t` when
/// `controlled` is `Some((c, t))`.
fn add_bit(
    s: &mut Session,
    controlled: Option<(QubitId, QubitId)>,
    a: QubitId,
    b: QubitId,
) -> SynthResult<()> {
    match controlled {
        Some((c, t)) => {
            and_compute(s, c, a, t)?;
            s.cx(t, b)?;
            and_uncompute(s, c, a, t)
        }
        None => Ok(s.cx(a, b)?),
    }
}

/// `target += source mod 2^n` (Gidney adder).
///
/// Uses `n - 1` carry ancillae and `4(n - 1)` T gates. The carries are erased
/// by mid-circuit measurement with classically controlled fixes, so the
/// fragment cannot run in a compute phase, an inversion or a quantum control
/// environment (see [`gidney_add_controlled`]), and simulating it needs shots.
pub fn gidney_add(
    session: &mut Session,
    target: &QuantumVariable,
    source: &QuantumVariable,
) -> SynthResult<()> {
    gidney(session, "gidney_add", target, source, None)
}

/// `target += source mod 2^n` if `control` is set.
///
/// The carry chain runs unconditionally; only the sum bits are written under
/// the control, each through a temporary AND on one extra ancilla.
pub fn gidney_add_controlled(
    session: &mut Session,
    target: &QuantumVariable,
    source: &QuantumVariable,
    control: QubitId,
) -> SynthResult<()> {
    if target.qubits().contains(&control) || source.qubits().contains(&control) {
        return Err(SynthesisError::UnsupportedShape {
            operation: "gidney_add_controlled",
            shape: format!("control {control} is an operand qubit"),
        });
    }
    gidney(session, "gidney_add_controlled", target, source, Some(control))
}

fn gidney(
    session: &mut Session,
    operation: &'static str,
    target: &QuantumVariable,
    source: &QuantumVariable,
    control: Option<QubitId>,
) -> SynthResult<()> {
    let n = target.width();
    check_width(operation, n)?;
    check_same_width(operation, n, source.width())?;
    debug!(width = n, controlled = control.is_some(), "gidney add");
    let (a, b) = (source.qubits(), target.qubits());

    // The source and the control come back unchanged.
    let restored: Vec<QubitId> = a
        .iter()
        .copied()
        .chain(control)
        .filter(|&q| session.is_clean(q))
        .collect();

    session.scope(operation, |s| -> SynthResult<()> {
        let controlled = match control {
            Some(c) => Some((c, s.allocate(1, "and")?[0])),
            None => None,
        };
        if n == 1 {
            add_bit(s, controlled, a[0], b[0])?;
        } else {
            // carry[i] is the carry into bit i + 1.
            let carry = s.allocate(n as u32 - 1, "carry")?;
            and_compute(s, a[0], b[0], carry[0])?;
            for i in 1..n - 1 {
                s.cx(carry[i - 1], a[i])?;
                s.cx(carry[i - 1], b[i])?;
                and_compute(s, a[i], b[i], carry[i])?;
                s.cx(carry[i - 1], carry[i])?;
            }

            s.cx(carry[n - 2], a[n - 1])?;
            add_bit(s, controlled, a[n - 1], b[n - 1])?;
            s.cx(carry[n - 2], a[n - 1])?;

            for i in (1..n - 1).rev() {
                s.cx(carry[i - 1], carry[i])?;
                and_uncompute(s, a[i], b[i], carry[i])?;
                add_bit(s, controlled, a[i], b[i])?;
                s.cx(carry[i - 1], a[i])?;
                s.cx(carry[i - 1], b[i])?;
            }
            and_uncompute(s, a[0], b[0], carry[0])?;
            add_bit(s, controlled, a[0], b[0])?;
            s.assert_restored(&carry)?;
        }
        if let Some((_, t)) = controlled {
            s.assert_restored(&[t])?;
        }
        Ok(())
    })?;
    session.assert_restored(&restored)?;
    Ok(())
}
