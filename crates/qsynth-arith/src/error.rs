//! Error types for arithmetic synthesis.

use qsynth_env::EnvError;
use qsynth_types::TypeError;
use thiserror::Error;

/// Widest register any fragment accepts.
pub const MAX_WIDTH: usize = 32;

/// Errors raised while synthesizing an arithmetic fragment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SynthesisError {
    /// Operand shape outside the supported range.
    #[error("{operation}: unsupported shape ({shape})")]
    UnsupportedShape {
        /// Fragment that rejected the shape.
        operation: &'static str,
        /// Description of the shape.
        shape: String,
    },

    /// Modulus below 2 or not representable in the register.
    #[error("{operation}: modulus {modulus} is not supported for width {width}")]
    InvalidModulus {
        /// Fragment that rejected the modulus.
        operation: &'static str,
        /// The modulus.
        modulus: u64,
        /// Register width.
        width: usize,
    },

    /// Multiplier without an inverse modulo the modulus.
    #[error("{a} has no inverse modulo {modulus}")]
    NotInvertible {
        /// The multiplier.
        a: u64,
        /// The modulus.
        modulus: u64,
    },

    /// Operands of different widths.
    #[error("{operation}: width mismatch, expected {expected}, got {got}")]
    WidthMismatch {
        /// Fragment that rejected the operands.
        operation: &'static str,
        /// Width of the first operand.
        expected: usize,
        /// Width of the offending operand.
        got: usize,
    },

    /// Session error while emitting the fragment.
    #[error(transparent)]
    Env(#[from] EnvError),

    /// Error building a result variable.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result type for synthesis.
pub type SynthResult<T> = Result<T, SynthesisError>;

/// Reject empty and over-wide registers.
pub(crate) fn check_width(operation: &'static str, width: usize) -> SynthResult<()> {
    if width == 0 || width > MAX_WIDTH {
        return Err(SynthesisError::UnsupportedShape {
            operation,
            shape: format!("width {width}, supported 1..={MAX_WIDTH}"),
        });
    }
    Ok(())
}

/// Reject operands whose widths differ.
pub(crate) fn check_same_width(
    operation: &'static str,
    expected: usize,
    got: usize,
) -> SynthResult<()> {
    if expected != got {
        return Err(SynthesisError::WidthMismatch {
            operation,
            expected,
            got,
        });
    }
    Ok(())
}
