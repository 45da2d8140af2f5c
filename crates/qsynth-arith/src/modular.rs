//! Modular arithmetic after Beauregard.
//!
//! The building block is [`mod_add_constant`], a doubly controlled
//! `b ← b + a mod N` on a Fourier-encoded register one bit wider than `N`
//! needs. A sign flag detects overflow; the flag is restored by comparing
//! again after subtracting `a`, which the leak checker cannot see, so the
//! fragment vouches for it with [`Session::assert_restored`].
//!
//! [`mod_multiply`] builds `x ← a·x mod N` from two controlled
//! multiply-accumulate passes around a swap.

use qsynth_env::Session;
use qsynth_ir::QubitId;
use qsynth_types::QuantumVariable;
use tracing::debug;

use crate::controlled;
use crate::error::{SynthResult, SynthesisError, check_width};
use crate::fourier::{inverse_transform, phase_add_constant, transform};

/// `gcd(a, b)`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// `(a · b) mod m` without overflow.
pub fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((u128::from(a) * u128::from(b)) % u128::from(m)) as u64
}

/// `a^(2^j) mod m`, by `j` squarings.
pub fn pow2_power_mod(a: u64, j: usize, m: u64) -> u64 {
    (0..j).fold(a % m, |acc, _| mul_mod(acc, acc, m))
}

/// Inverse of `a` modulo `m`, if it exists.
pub fn mod_inverse(a: u64, m: u64) -> Option<u64> {
    let (mut old_r, mut r) = (i128::from(a % m), i128::from(m));
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }
    (old_r == 1).then(|| old_s.rem_euclid(i128::from(m)) as u64)
}

/// Check that `modulus` fits a register of `width` bits.
fn check_modulus(operation: &'static str, modulus: u64, width: usize) -> SynthResult<()> {
    check_width(operation, width)?;
    if modulus < 2 || u128::from(modulus) > 1u128 << width {
        return Err(SynthesisError::InvalidModulus {
            operation,
            modulus,
            width,
        });
    }
    Ok(())
}

/// `b ← b + a mod N` on a Fourier-encoded `b` of width `w + 1`.
///
/// `b` must hold a value below `modulus` and `anc` must be |0>; both hold on
/// exit. The addition of `a` is controlled on `controls`; the internal
/// reduction steps are not, since they cancel when the addition is skipped.
pub fn mod_add_constant(
    session: &mut Session,
    b: &[QubitId],
    a: u64,
    modulus: u64,
    anc: QubitId,
    controls: &[QubitId],
) -> SynthResult<()> {
    let Some(&msb) = b.last() else {
        return Err(SynthesisError::UnsupportedShape {
            operation: "mod_add_constant",
            shape: "empty register".into(),
        });
    };
    check_modulus("mod_add_constant", modulus, b.len() - 1)?;
    let a = (a % modulus) as i64;
    let n = modulus as i64;

    controlled(session, controls, |s| phase_add_constant(s, b, a))?;
    phase_add_constant(session, b, -n)?;
    // Flag the underflow of b + a - N.
    session.conjugate(
        "compare",
        |s| inverse_transform(s, b),
        |s, ()| Ok(s.cx(msb, anc)?),
    )?;
    session.control(&[anc], |s| phase_add_constant(s, b, n))?;
    // Subtracting a again leaves a negative value exactly when the flag was
    // not set; comparing once more clears it.
    session.conjugate(
        "clear_flag",
        |s| controlled(s, controls, |s| phase_add_constant(s, b, -a)),
        |s, ()| {
            s.conjugate(
                "compare",
                |s| -> SynthResult<()> {
                    inverse_transform(s, b)?;
                    s.x(msb)?;
                    Ok(())
                },
                |s, ()| Ok(s.cx(msb, anc)?),
            )
        },
    )?;
    session.assert_restored(&[anc])?;
    Ok(())
}

/// `b ← b + a·x mod N`, controlled on `controls`.
fn multiply_accumulate(
    session: &mut Session,
    x: &[QubitId],
    b: &[QubitId],
    a: u64,
    modulus: u64,
    anc: QubitId,
    controls: &[QubitId],
) -> SynthResult<()> {
    session.conjugate(
        "cmult",
        |s| transform(s, b),
        |s, ()| {
            let mut term = a % modulus;
            for &xi in x {
                let mut c = controls.to_vec();
                c.push(xi);
                mod_add_constant(s, b, term, modulus, anc, &c)?;
                term = mul_mod(term, 2, modulus);
            }
            Ok(())
        },
    )
}

/// `x ← a·x mod N` in place, controlled on `controls`.
///
/// Requires `x < N`, `gcd(a, N) = 1` and `N ≤ 2^w` for a width-`w` `x`. A
/// `w + 1` work register and a flag qubit are borrowed for the duration and
/// returned clean.
pub fn mod_multiply(
    session: &mut Session,
    x: &QuantumVariable,
    a: u64,
    modulus: u64,
    controls: &[QubitId],
) -> SynthResult<()> {
    let w = x.width();
    check_modulus("mod_multiply", modulus, w)?;
    let a = a % modulus;
    let a_inv = mod_inverse(a, modulus).ok_or(SynthesisError::NotInvertible { a, modulus })?;
    debug!(width = w, modulus, a, controls = controls.len(), "mod multiply");

    let xq = x.qubits();
    session.scope("mod_multiply", |s| {
        let b = s.allocate(w as u32 + 1, "work")?;
        let anc = s.allocate(1, "flag")?[0];

        multiply_accumulate(s, xq, &b, a, modulus, anc, controls)?;
        controlled(s, controls, |s| {
            for (&xi, &bi) in xq.iter().zip(&b) {
                s.swap(xi, bi)?;
            }
            Ok(())
        })?;
        s.invert(|s| multiply_accumulate(s, xq, &b, a_inv, modulus, anc, controls))?;

        // b now holds x - a⁻¹·(a·x) = 0.
        s.assert_restored(&b)?;
        s.assert_restored(&[anc])?;
        Ok(())
    })
}

/// Multiply `x` by `a^(2^j) mod N` when `control` is set.
pub fn mod_exp_step(
    session: &mut Session,
    x: &QuantumVariable,
    control: QubitId,
    a: u64,
    j: usize,
    modulus: u64,
) -> SynthResult<()> {
    check_modulus("mod_exp_step", modulus, x.width())?;
    let factor = pow2_power_mod(a, j, modulus);
    debug!(step = j, factor, modulus, "mod exp step");
    mod_multiply(session, x, factor, modulus, &[control])
}

/// `x ← a^e · x mod N` for the exponent held in `exponent`.
pub fn mod_exp(
    session: &mut Session,
    exponent: &QuantumVariable,
    x: &QuantumVariable,
    a: u64,
    modulus: u64,
) -> SynthResult<()> {
    check_modulus("mod_exp", modulus, x.width())?;
    if gcd(a % modulus, modulus) != 1 {
        return Err(SynthesisError::NotInvertible { a, modulus });
    }
    debug!(
        width = x.width(),
        exponent_width = exponent.width(),
        modulus,
        "mod exp"
    );
    for (j, &e) in exponent.qubits().iter().enumerate() {
        mod_exp_step(session, x, e, a, j, modulus)?;
    }
    Ok(())
}
