//! Cyclic shift of a list of equally wide cells by a quantum offset.
//!
//! Content at cell `i` moves to cell `(i + k) mod n`. The offset is read bit by
//! bit: stage `j` rotates by `2^j mod n` under control of offset bit `j`.

use qsynth_env::Session;
use qsynth_types::QuantumVariable;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SynthResult, SynthesisError, check_same_width, check_width};

/// How each controlled rotation stage is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStrategy {
    /// Rotate by reversals: at most `n` cell swaps per stage.
    #[default]
    Doubling,
    /// Rotate by one cell, `2^j mod n` times per stage.
    Naive,
}

/// Validate the cell list, returning the common cell width.
fn check_cells(operation: &'static str, cells: &[QuantumVariable]) -> SynthResult<usize> {
    let Some(first) = cells.first() else {
        return Err(SynthesisError::UnsupportedShape {
            operation,
            shape: "no cells".into(),
        });
    };
    let width = first.width();
    check_width(operation, width)?;
    for cell in &cells[1..] {
        check_same_width(operation, width, cell.width())?;
    }
    Ok(width)
}

fn swap_cells(session: &mut Session, a: &QuantumVariable, b: &QuantumVariable) -> SynthResult<()> {
    for (&qa, &qb) in a.qubits().iter().zip(b.qubits()) {
        session.swap(qa, qb)?;
    }
    Ok(())
}

/// Reverse the order of `cells`.
fn reverse(session: &mut Session, cells: &[QuantumVariable]) -> SynthResult<()> {
    let n = cells.len();
    for i in 0..n / 2 {
        swap_cells(session, &cells[i], &cells[n - 1 - i])?;
    }
    Ok(())
}

/// Rotate right by `r` with three reversals; the last two act on disjoint
/// cells and share a layer.
fn rotate_reversals(session: &mut Session, cells: &[QuantumVariable], r: usize) -> SynthResult<()> {
    reverse(session, cells)?;
    reverse(session, &cells[..r])?;
    reverse(session, &cells[r..])
}

/// Rotate right by one with a chain of adjacent swaps.
fn rotate_by_one(session: &mut Session, cells: &[QuantumVariable]) -> SynthResult<()> {
    for i in (1..cells.len()).rev() {
        swap_cells(session, &cells[i], &cells[i - 1])?;
    }
    Ok(())
}

fn rotate(
    session: &mut Session,
    cells: &[QuantumVariable],
    r: usize,
    strategy: ShiftStrategy,
) -> SynthResult<()> {
    match strategy {
        ShiftStrategy::Doubling => rotate_reversals(session, cells, r),
        ShiftStrategy::Naive => {
            for _ in 0..r {
                rotate_by_one(session, cells)?;
            }
            Ok(())
        }
    }
}

/// Shift `cells` by the value of `offset`, using [`ShiftStrategy::Doubling`].
pub fn cyclic_shift(
    session: &mut Session,
    cells: &[QuantumVariable],
    offset: &QuantumVariable,
) -> SynthResult<()> {
    cyclic_shift_with(session, cells, offset, ShiftStrategy::Doubling)
}

/// Shift `cells` by the value of `offset`.
///
/// With an offset of `⌈log2 n⌉` bits the doubling strategy emits at most
/// `w·n·⌈log2 n⌉` controlled swaps for cells of width `w`.
pub fn cyclic_shift_with(
    session: &mut Session,
    cells: &[QuantumVariable],
    offset: &QuantumVariable,
    strategy: ShiftStrategy,
) -> SynthResult<()> {
    let width = check_cells("cyclic_shift", cells)?;
    check_width("cyclic_shift", offset.width())?;
    let n = cells.len();
    debug!(
        cells = n,
        width,
        offset_width = offset.width(),
        ?strategy,
        "cyclic shift"
    );

    for (j, &control) in offset.qubits().iter().enumerate() {
        let r = ((1u64 << j) % n as u64) as usize;
        if r == 0 {
            continue;
        }
        session.control(&[control], |s| rotate(s, cells, r, strategy))?;
    }
    Ok(())
}

/// Shift `cells` by a classical `k`; negative `k` shifts left.
pub fn cyclic_shift_by(session: &mut Session, cells: &[QuantumVariable], k: i64) -> SynthResult<()> {
    check_cells("cyclic_shift", cells)?;
    let r = k.rem_euclid(cells.len() as i64) as usize;
    if r != 0 {
        rotate_reversals(session, cells, r)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsynth_ir::ResourceCounts;

    fn cells(s: &mut Session, n: usize, width: usize) -> Vec<QuantumVariable> {
        (0..n)
            .map(|i| QuantumVariable::integer(s, format!("c{i}"), width).unwrap())
            .collect()
    }

    #[test]
    fn test_shift_by_zero_is_empty() {
        let mut s = Session::named("t");
        let c = cells(&mut s, 5, 2);
        cyclic_shift_by(&mut s, &c, 10).unwrap();
        assert!(s.circuit().instructions().is_empty());
    }

    #[test]
    fn test_controlled_stages_emit_cswap() {
        let mut s = Session::named("t");
        let c = cells(&mut s, 4, 1);
        let k = QuantumVariable::integer(&mut s, "k", 2).unwrap();
        cyclic_shift(&mut s, &c, &k).unwrap();
        let counts = ResourceCounts::from_circuit(s.circuit());
        assert_eq!(counts.count("swap"), 0);
        assert!(counts.count("cswap") > 0);
        assert!(counts.count("cswap") <= 4 * 2);
    }

    #[test]
    fn test_mismatched_cells_rejected() {
        let mut s = Session::named("t");
        let mut c = cells(&mut s, 2, 2);
        c.push(QuantumVariable::integer(&mut s, "odd", 3).unwrap());
        let k = QuantumVariable::integer(&mut s, "k", 2).unwrap();
        assert!(matches!(
            cyclic_shift(&mut s, &c, &k),
            Err(SynthesisError::WidthMismatch { expected: 2, got: 3, .. })
        ));
        assert!(matches!(
            cyclic_shift(&mut s, &[], &k),
            Err(SynthesisError::UnsupportedShape { .. })
        ));
    }

    #[test]
    fn test_strategy_serde() {
        assert_eq!(serde_json::to_string(&ShiftStrategy::Naive).unwrap(), "\"naive\"");
    }
}
