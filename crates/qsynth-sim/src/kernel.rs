//! Gate lowering to controlled single-qubit kernels.
//!
//! Every gate in the IR is a root gate plus leading controls. Roots acting on
//! one qubit lower to one kernel; a swap root lowers to three controlled-X
//! kernels.

use num_complex::Complex64;
use qsynth_ir::{GateKind, StandardGate};
use rayon::prelude::*;
use std::f64::consts::FRAC_1_SQRT_2;

use crate::error::{SimError, SimResult};

/// Row-major 2x2 complex matrix.
pub type Matrix2 = [[Complex64; 2]; 2];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// A 2x2 matrix on `target`, applied where every bit in `controls` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    /// The matrix.
    pub matrix: Matrix2,
    /// Target qubit index.
    pub target: usize,
    /// Bit mask of control qubits.
    pub controls: usize,
}

/// Matrix of a one-qubit root gate with evaluated parameters.
///
/// Returns `None` for two-qubit roots.
pub fn root_matrix(gate: &StandardGate, params: &[f64]) -> Option<Matrix2> {
    let p = |i: usize| params.get(i).copied().unwrap_or(0.0);
    let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
    let m = match gate {
        StandardGate::I => [[ONE, ZERO], [ZERO, ONE]],
        StandardGate::X => [[ZERO, ONE], [ONE, ZERO]],
        StandardGate::Y => [[ZERO, -I], [I, ZERO]],
        StandardGate::Z => phase(std::f64::consts::PI),
        StandardGate::H => [[h, h], [h, -h]],
        StandardGate::S => phase(std::f64::consts::FRAC_PI_2),
        StandardGate::Sdg => phase(-std::f64::consts::FRAC_PI_2),
        StandardGate::T => phase(std::f64::consts::FRAC_PI_4),
        StandardGate::Tdg => phase(-std::f64::consts::FRAC_PI_4),
        StandardGate::SX => {
            let a = Complex64::new(0.5, 0.5);
            let b = Complex64::new(0.5, -0.5);
            [[a, b], [b, a]]
        }
        StandardGate::SXdg => {
            let a = Complex64::new(0.5, -0.5);
            let b = Complex64::new(0.5, 0.5);
            [[a, b], [b, a]]
        }
        StandardGate::Rx(_) => {
            let (c, s) = half_angle(p(0));
            [[c.into(), -I * s], [-I * s, c.into()]]
        }
        StandardGate::Ry(_) => {
            let (c, s) = half_angle(p(0));
            [[c.into(), (-s).into()], [s.into(), c.into()]]
        }
        StandardGate::Rz(_) => [
            [Complex64::from_polar(1.0, -p(0) / 2.0), ZERO],
            [ZERO, Complex64::from_polar(1.0, p(0) / 2.0)],
        ],
        StandardGate::P(_) => phase(p(0)),
        StandardGate::U(..) => {
            let (c, s) = half_angle(p(0));
            let (phi, lambda) = (p(1), p(2));
            [
                [c.into(), -Complex64::from_polar(s, lambda)],
                [
                    Complex64::from_polar(s, phi),
                    Complex64::from_polar(c, phi + lambda),
                ],
            ]
        }
        _ => return None,
    };
    Some(m)
}

fn phase(theta: f64) -> Matrix2 {
    [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, theta)]]
}

fn half_angle(theta: f64) -> (f64, f64) {
    ((theta / 2.0).cos(), (theta / 2.0).sin())
}

/// Lower a gate on `qubits` (controls first) to kernels.
pub fn lower(kind: &GateKind, qubits: &[usize], params: &[f64]) -> SimResult<Vec<Kernel>> {
    let (root, n) = kind.split_controls();
    let n = n as usize;
    let controls = qubits[..n].iter().fold(0usize, |m, &q| m | (1 << q));
    lower_root(&root, &qubits[n..], controls, params)
}

fn lower_root(
    root: &StandardGate,
    targets: &[usize],
    controls: usize,
    params: &[f64],
) -> SimResult<Vec<Kernel>> {
    if let StandardGate::Swap = root {
        let (a, b) = (targets[0], targets[1]);
        let x = [[ZERO, ONE], [ONE, ZERO]];
        return Ok(vec![
            Kernel { matrix: x, target: b, controls: controls | (1 << a) },
            Kernel { matrix: x, target: a, controls: controls | (1 << b) },
            Kernel { matrix: x, target: b, controls: controls | (1 << a) },
        ]);
    }

    let matrix = root_matrix(root, params).ok_or_else(|| SimError::UnsupportedGate {
        name: root.name().to_string(),
    })?;
    Ok(vec![Kernel {
        matrix,
        target: targets[0],
        controls,
    }])
}

#[inline]
fn update_pair(m: &Matrix2, a: &mut Complex64, b: &mut Complex64) {
    let (x, y) = (*a, *b);
    *a = m[0][0] * x + m[0][1] * y;
    *b = m[1][0] * x + m[1][1] * y;
}

/// Apply a kernel to a dense amplitude vector.
///
/// With `parallel` the update is split over rayon workers by blocks of
/// basis indices; the call returns once every block is done. When there are
/// fewer blocks than workers (high target qubits), each block's amplitude
/// pairs are split across the workers instead.
pub fn apply(kernel: &Kernel, amplitudes: &mut [Complex64], parallel: bool) {
    let stride = 1usize << kernel.target;
    let block = stride * 2;
    let update = |base: usize, chunk: &mut [Complex64]| {
        let (lo, hi) = chunk.split_at_mut(stride);
        for (j, (a, b)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
            if (base + j) & kernel.controls == kernel.controls {
                update_pair(&kernel.matrix, a, b);
            }
        }
    };

    if parallel && amplitudes.len() / block < rayon::current_num_threads() {
        for (i, chunk) in amplitudes.chunks_mut(block).enumerate() {
            let base = i * block;
            let (lo, hi) = chunk.split_at_mut(stride);
            lo.par_iter_mut()
                .zip(hi.par_iter_mut())
                .enumerate()
                .filter(|(j, _)| (base + j) & kernel.controls == kernel.controls)
                .for_each(|(_, (a, b))| update_pair(&kernel.matrix, a, b));
        }
    } else if parallel {
        amplitudes
            .par_chunks_mut(block)
            .enumerate()
            .for_each(|(i, chunk)| update(i * block, chunk));
    } else {
        amplitudes
            .chunks_mut(block)
            .enumerate()
            .for_each(|(i, chunk)| update(i * block, chunk));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsynth_ir::ParameterExpression;

    fn close(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-12
    }

    fn matmul(a: &Matrix2, b: &Matrix2) -> Matrix2 {
        let mut out = [[ZERO; 2]; 2];
        for r in 0..2 {
            for c in 0..2 {
                out[r][c] = a[r][0] * b[0][c] + a[r][1] * b[1][c];
            }
        }
        out
    }

    #[test]
    fn test_sx_squared_is_x() {
        let sx = root_matrix(&StandardGate::SX, &[]).unwrap();
        let x = root_matrix(&StandardGate::X, &[]).unwrap();
        let sq = matmul(&sx, &sx);
        for r in 0..2 {
            for c in 0..2 {
                assert!(close(sq[r][c], x[r][c]));
            }
        }
    }

    #[test]
    fn test_u_matches_ry() {
        let theta = 0.7;
        let u = root_matrix(
            &StandardGate::U(
                ParameterExpression::constant(theta),
                ParameterExpression::constant(0.0),
                ParameterExpression::constant(0.0),
            ),
            &[theta, 0.0, 0.0],
        )
        .unwrap();
        let ry = root_matrix(
            &StandardGate::Ry(ParameterExpression::constant(theta)),
            &[theta],
        )
        .unwrap();
        for r in 0..2 {
            for c in 0..2 {
                assert!(close(u[r][c], ry[r][c]));
            }
        }
    }

    #[test]
    fn test_swap_lowers_to_three_cx() {
        let kernels = lower(&GateKind::Standard(StandardGate::CSwap), &[0, 1, 2], &[]).unwrap();
        assert_eq!(kernels.len(), 3);
        assert_eq!(kernels[0].controls, 0b011);
        assert_eq!(kernels[1].controls, 0b101);
        assert_eq!(kernels[1].target, 1);
    }

    #[test]
    fn test_top_qubit_parallel_matches_serial() {
        // Target 5 of 6 qubits: one block, split pair-wise across workers.
        let h = lower(&GateKind::Standard(StandardGate::H), &[5], &[]).unwrap().remove(0);
        let cx = lower(&GateKind::Standard(StandardGate::CX), &[2, 5], &[]).unwrap().remove(0);
        let start: Vec<Complex64> = (0..64)
            .map(|i| Complex64::new(i as f64, -(i as f64) / 2.0) / 100.0)
            .collect();
        for kernel in [&h, &cx] {
            let mut serial = start.clone();
            let mut parallel = start.clone();
            apply(kernel, &mut serial, false);
            apply(kernel, &mut parallel, true);
            for (a, b) in serial.iter().zip(&parallel) {
                assert!(close(*a, *b));
            }
        }
        let mut amps = start.clone();
        apply(&cx, &mut amps, true);
        assert!(close(amps[0b000100], start[0b100100]));
        assert!(close(amps[0b000001], start[0b000001]));
    }

    #[test]
    fn test_two_qubit_root_is_rejected() {
        let err = lower_root(&StandardGate::CZ, &[0, 1], 0, &[]).unwrap_err();
        assert!(matches!(err, SimError::UnsupportedGate { ref name } if name == "cz"));
    }

    #[test]
    fn test_controlled_kernel_respects_mask() {
        // |10> with control on qubit 0 clear: CX does nothing
        let mut amps = vec![ZERO; 4];
        amps[0b10] = ONE;
        let kernels = lower(&GateKind::Standard(StandardGate::CX), &[0, 1], &[]).unwrap();
        let k = &kernels[0];
        apply(k, &mut amps, false);
        assert!(close(amps[0b10], ONE));

        // |01>: control set, target flips
        let mut amps = vec![ZERO; 4];
        amps[0b01] = ONE;
        apply(k, &mut amps, true);
        assert!(close(amps[0b11], ONE));
    }
}
