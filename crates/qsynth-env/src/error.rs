//! Error types for the environment manager.

use qsynth_ir::{IrError, QubitId, ResourceError};
use thiserror::Error;

use crate::frame::FrameId;

/// Errors raised while compiling inside a [`Session`](crate::Session).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnvError {
    /// Allocation, release or ownership failure.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// An environment was exited out of LIFO order.
    #[error("Environment {got} exited while {expected} is innermost")]
    ScopeViolation {
        /// The innermost open frame.
        expected: FrameId,
        /// The frame the caller tried to exit.
        got: FrameId,
    },

    /// A previous scope violation left the session in an unknown state.
    #[error("Session is poisoned by an earlier scope violation")]
    SessionPoisoned,

    /// A fragment left owned qubits entangled with the rest of the state.
    #[error("Fragment '{fragment}' leaves qubits {qubits:?} entangled at exit")]
    Uncomputation {
        /// Label of the frame that failed the check.
        fragment: String,
        /// The leaked qubits.
        qubits: Vec<QubitId>,
    },

    /// An operation has no inverse.
    #[error("Cannot invert {0}")]
    NonInvertible(String),

    /// An operation cannot be placed inside the given environment.
    #[error("{operation} is not allowed inside a {frame} environment")]
    Uncontrollable {
        /// Name of the rejected operation.
        operation: String,
        /// Kind of the enclosing environment.
        frame: &'static str,
    },

    /// Qubits allocated under classical control tried to outlive it.
    #[error("Qubits {0:?} cannot leave a classical-control environment")]
    CarryValue(Vec<QubitId>),

    /// A qubit cannot be exported from the innermost frame.
    #[error("Qubit {qubit} cannot be exported: {reason}")]
    InvalidExport {
        /// The qubit.
        qubit: QubitId,
        /// Why the export was refused.
        reason: &'static str,
    },

    /// `begin_action` outside a conjugation's compute phase.
    #[error("No conjugation is in its compute phase")]
    NotInCompute,

    /// No user environment is open.
    #[error("No open environment")]
    NoOpenFrame,

    /// The session was finished with environments still open.
    #[error("{0} environments are still open")]
    UnclosedEnvironment(usize),

    /// Circuit construction error.
    #[error(transparent)]
    Ir(#[from] IrError),
}

/// Result type for environment operations.
pub type EnvResult<T> = Result<T, EnvError>;
