//! Dense state vector.

use num_complex::Complex64;
use rand::Rng;

use crate::kernel::{self, Kernel};

/// A state vector of `2^n` amplitudes. Qubit `k` is bit `k` of the basis index.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    amplitudes: Vec<Complex64>,
    num_qubits: usize,
}

impl Statevector {
    /// Create a state vector initialized to |0...0>.
    pub fn new(num_qubits: usize) -> Self {
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Wrap existing amplitudes. The length must be a power of two.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> Option<Self> {
        if !amplitudes.len().is_power_of_two() {
            return None;
        }
        let num_qubits = amplitudes.len().trailing_zeros() as usize;
        Some(Self {
            amplitudes,
            num_qubits,
        })
    }

    pub(crate) fn from_raw(amplitudes: Vec<Complex64>, num_qubits: usize) -> Self {
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Consume into the amplitude vector.
    pub fn into_amplitudes(self) -> Vec<Complex64> {
        self.amplitudes
    }

    /// Apply one kernel.
    pub fn apply(&mut self, kernel: &Kernel, parallel: bool) {
        kernel::apply(kernel, &mut self.amplitudes, parallel);
    }

    /// Squared norm.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    /// Basis-state probabilities.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Probability that `qubit` reads 1.
    pub fn probability_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Measure `qubit`, collapsing and renormalizing the state.
    pub fn measure<R: Rng>(&mut self, qubit: usize, rng: &mut R) -> bool {
        let p1 = self.probability_one(qubit);
        let outcome = rng.r#gen::<f64>() < p1;
        let keep = if outcome { p1 } else { 1.0 - p1 };
        let scale = if keep > 0.0 { 1.0 / keep.sqrt() } else { 0.0 };
        let mask = 1 << qubit;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if ((i & mask) != 0) == outcome {
                *amp *= scale;
            } else {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
        outcome
    }

    /// Sample a basis index by the Born rule.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        let r: f64 = rng.r#gen::<f64>() * self.norm_sqr();
        let mut cumulative = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            cumulative += amp.norm_sqr();
            if r < cumulative {
                return i;
            }
        }
        self.amplitudes.len() - 1
    }

    /// Fidelity `|<self|other>|^2`; zero if the widths differ.
    pub fn fidelity(&self, other: &Statevector) -> f64 {
        if self.num_qubits != other.num_qubits {
            return 0.0;
        }
        self.amplitudes
            .iter()
            .zip(&other.amplitudes)
            .map(|(a, b)| a.conj() * b)
            .sum::<Complex64>()
            .norm_sqr()
    }
}
