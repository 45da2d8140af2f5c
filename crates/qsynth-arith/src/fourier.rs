//! Fourier-basis encoding.
//!
//! [`transform`] is the quantum Fourier transform without the final bit
//! reversal: afterwards qubit `t` of a register holding `b` carries the phase
//! `e^{2πi·b/2^(t+1)}` on its |1> component. Additions in this basis are
//! single-qubit phases, see [`phase_add_constant`].

use std::f64::consts::{PI, TAU};

use qsynth_env::Session;
use qsynth_ir::QubitId;
use tracing::trace;

use crate::error::{SynthResult, SynthesisError};

/// Longest register the phase arithmetic handles exactly.
const MAX_PHASE_WIDTH: usize = 62;

fn check_register(operation: &'static str, reg: &[QubitId]) -> SynthResult<()> {
    if reg.is_empty() || reg.len() > MAX_PHASE_WIDTH {
        return Err(SynthesisError::UnsupportedShape {
            operation,
            shape: format!("register of {} qubits", reg.len()),
        });
    }
    Ok(())
}

/// Encode `reg` (least significant first) into the Fourier basis.
pub fn transform(session: &mut Session, reg: &[QubitId]) -> SynthResult<()> {
    check_register("fourier", reg)?;
    trace!(width = reg.len(), "fourier transform");
    // Highest qubit first: qubit t reads the bits below it before they change.
    for t in (0..reg.len()).rev() {
        session.h(reg[t])?;
        for k in (0..t).rev() {
            session.cp(PI / 2f64.powi((t - k) as i32), reg[k], reg[t])?;
        }
    }
    Ok(())
}

/// Adjoint of [`transform`].
pub fn inverse_transform(session: &mut Session, reg: &[QubitId]) -> SynthResult<()> {
    session.invert(|s| transform(s, reg))
}

/// Add `c` modulo `2^len` to a Fourier-encoded register.
///
/// Emits one phase gate per qubit whose phase is not a multiple of 2π.
pub fn phase_add_constant(session: &mut Session, reg: &[QubitId], c: i64) -> SynthResult<()> {
    check_register("phase_add", reg)?;
    for (t, &q) in reg.iter().enumerate() {
        let period = 1i64 << (t + 1);
        let r = c.rem_euclid(period);
        if r != 0 {
            session.p(TAU * r as f64 / period as f64, q)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsynth_ir::ResourceCounts;

    #[test]
    fn test_transform_gate_counts() {
        let mut s = Session::named("t");
        let q = s.allocate(4, "q").unwrap();
        transform(&mut s, &q).unwrap();
        let counts = ResourceCounts::from_circuit(s.circuit());
        assert_eq!(counts.count("h"), 4);
        assert_eq!(counts.count("cp"), 6);
        assert_eq!(counts.count("swap"), 0);
    }

    #[test]
    fn test_inverse_reverses_order() {
        let mut s = Session::named("t");
        let q = s.allocate(3, "q").unwrap();
        inverse_transform(&mut s, &q).unwrap();
        let last = s.circuit().instructions().last().unwrap();
        // The forward transform starts with H on the top qubit.
        assert_eq!(last.name(), "h");
        assert_eq!(last.qubits, vec![q[2]]);
    }

    #[test]
    fn test_phase_add_skips_full_turns() {
        let mut s = Session::named("t");
        let q = s.allocate(3, "q").unwrap();
        // 4 = 0b100: only the top qubit sees a non-trivial phase.
        phase_add_constant(&mut s, &q, 4).unwrap();
        assert_eq!(s.circuit().num_ops(), 1);
        assert_eq!(s.circuit().instructions()[0].qubits, vec![q[2]]);
    }

    #[test]
    fn test_empty_register_rejected() {
        let mut s = Session::named("t");
        assert!(matches!(
            transform(&mut s, &[]),
            Err(SynthesisError::UnsupportedShape { operation: "fourier", .. })
        ));
    }
}
