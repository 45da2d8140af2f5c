//! Error types for the simulator.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced while simulating a circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// The circuit is wider than the configured limit.
    #[error("Circuit has {requested} qubits but the simulator allows {max}")]
    TooManyQubits {
        /// Width of the circuit.
        requested: usize,
        /// Configured limit.
        max: u32,
    },

    /// A free parameter has no value.
    #[error("No value bound for parameter '{name}'")]
    ParameterBinding {
        /// The first missing symbol in sorted order.
        name: String,
    },

    /// Exact probabilities were requested for a circuit that measures
    /// mid-circuit or conditions gates on measured bits.
    #[error("Circuit is dynamic; request shots to simulate it")]
    DynamicCircuit,

    /// A gate whose root has no one-qubit matrix and is not a swap.
    #[error("Gate root '{name}' cannot be simulated")]
    UnsupportedGate {
        /// Name of the root gate.
        name: String,
    },

    /// The run was cancelled between two gates.
    #[error("Simulation cancelled")]
    Cancelled,

    /// An output register names a qubit outside the circuit.
    #[error("Output register '{register}' reads qubit {qubit} outside the circuit")]
    InvalidRegister {
        /// Register name.
        register: String,
        /// The offending qubit index.
        qubit: u32,
    },

    /// The worker pool could not be built.
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),

    /// Invalid simulator configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Circuit error.
    #[error("Circuit IR error: {0}")]
    Ir(#[from] qsynth_ir::IrError),
}

/// Result type for simulation.
pub type SimResult<T> = Result<T, SimError>;
