//! Error types for quantum variables.

use qsynth_env::EnvError;
use qsynth_sim::SimError;
use thiserror::Error;

/// Errors that can occur when working with quantum variables.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TypeError {
    /// Width not supported by the decoder.
    #[error("Invalid width {width} for {decoder} variable")]
    InvalidWidth {
        /// Decoder name.
        decoder: &'static str,
        /// Requested width.
        width: usize,
    },

    /// Value does not fit in the variable.
    #[error("Value {value} does not fit in {width} bits as {decoder}")]
    Overflow {
        /// Decoder name.
        decoder: &'static str,
        /// The rejected value.
        value: String,
        /// Variable width.
        width: usize,
    },

    /// Value of the wrong kind for the decoder.
    #[error("{decoder} variable cannot hold {value}")]
    ValueMismatch {
        /// Decoder name.
        decoder: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Character outside the encodable alphabet.
    #[error("Character {0:?} is not in the alphabet")]
    UnknownSymbol(char),

    /// Fixed-point value not a multiple of the resolution.
    #[error("{value} is not a multiple of 2^{exponent}")]
    Inexact {
        /// The rejected value.
        value: f64,
        /// Fixed-point exponent.
        exponent: i32,
    },

    /// Session error while allocating or initializing.
    #[error(transparent)]
    Env(#[from] EnvError),

    /// Simulation error while measuring.
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Result type for quantum variable operations.
pub type TypeResult<T> = Result<T, TypeError>;
