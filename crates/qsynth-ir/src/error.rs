//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors raised while building or validating a circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit not registered in the circuit.
    #[error("Qubit {qubit} not found in circuit{}", format_gate_context(.gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit not registered in the circuit.
    #[error("Classical bit {clbit} not found in circuit{}", format_gate_context(.gate_name))]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Invalid DAG structure.
    #[error("Invalid DAG structure: {0}")]
    InvalidDag(String),

    /// Gate requires a different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Parameter has no value.
    #[error("Parameter '{0}' is unbound")]
    UnboundParameter(String),

    /// Parameter evaluated to NaN or infinity.
    #[error("Parameter expression '{0}' is not finite")]
    NonFiniteParameter(String),

    /// Duplicate qubit in one operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// The circuit is sealed and no longer accepts operations.
    #[error("Circuit '{0}' is finished and cannot be modified")]
    Finished(String),
}

/// Errors raised by the qubit allocator and by ownership checks on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ResourceError {
    /// The pool cannot grow to satisfy the request.
    #[error("Cannot allocate {requested} qubits: {live} live, capacity {capacity}")]
    CapacityExceeded {
        /// Number of qubits requested.
        requested: u32,
        /// Qubits live at the time of the request.
        live: u32,
        /// Configured capacity.
        capacity: u32,
    },

    /// The qubit is not currently allocated.
    #[error("Qubit {0} is not allocated")]
    NotAllocated(QubitId),

    /// The same qubit appears twice in a release request.
    #[error("Qubit {0} released twice in one request")]
    DuplicateRelease(QubitId),

    /// The qubit is still referenced by an open environment.
    #[error("Qubit {qubit} is still referenced by open {frame} environment")]
    PendingEnvironment {
        /// The qubit.
        qubit: QubitId,
        /// Kind of the environment holding it.
        frame: String,
    },

    /// The qubit is owned by a different scope.
    #[error("Qubit {0} is not owned by the innermost scope")]
    NotOwned(QubitId),

    /// Allocation was attempted inside an inversion environment.
    #[error("Qubits cannot be allocated inside an inversion environment")]
    AllocationInInversion,
}

/// Helper function to format optional gate context.
#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;

/// Result type for allocator operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
