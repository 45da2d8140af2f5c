//! qsynth state-vector simulator.
//!
//! Runs circuits produced by a compilation session and reports either exact
//! outcome probabilities or sampled counts over named output registers.
//!
//! # Features
//!
//! - **Kernels**: every gate lowers to controlled 2x2 updates on amplitude
//!   pairs; no dense gate matrices are built
//! - **Parallelism**: wide states are updated on the rayon pool, one gate at
//!   a time
//! - **Symbolic parameters**: amplitudes can be built once and evaluated for
//!   many parameter bindings
//! - **Dynamic circuits**: mid-circuit measurement and classically
//!   conditioned gates are simulated per shot
//! - **Seeded sampling** and cooperative **cancellation**
//!
//! # Performance
//!
//! | Qubits | Memory |
//! |--------|--------|
//! | 10 | ~16 KB |
//! | 20 | ~16 MB |
//! | 24 | ~256 MB |
//! | 30 | ~16 GB |

pub mod config;
pub mod error;
pub mod kernel;
pub mod progress;
pub mod simulator;
pub mod statevector;
pub mod symbolic;

pub use config::{ConfigError, ProgressMode, SimulatorConfig};
pub use error::{SimError, SimResult};
pub use progress::{CancellationToken, ProgressGuard};
pub use simulator::{OutputRegister, Outcome, SimulationRequest, SimulationResult, Simulator};
pub use statevector::Statevector;
pub use symbolic::{Amplitude, SymbolicStatevector};
