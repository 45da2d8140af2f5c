//! Quantum variables for qsynth.
//!
//! A [`QuantumVariable`] is a named group of qubits allocated through a
//! [`Session`](qsynth_env::Session), plus a [`Decoder`] that turns a measured
//! bit pattern into a typed [`Value`].
//!
//! # Decodings
//!
//! - [`Decoder::Integer`] - unsigned or two's complement
//! - [`Decoder::Fixed`] - integer reading times `2^exponent`
//! - [`Decoder::Boolean`] - one qubit
//! - [`Decoder::Char`] - five qubits over [`CHAR_ALPHABET`]
//! - [`Decoder::Bitstring`] - the raw pattern
//!
//! # Example
//!
//! ```
//! use qsynth_env::Session;
//! use qsynth_sim::{Simulator, SimulatorConfig};
//! use qsynth_types::{MeasureOptions, QuantumVariable, Value};
//!
//! let mut s = Session::named("half");
//! let x = QuantumVariable::fixed(&mut s, "x", 3, -1, false)?;
//! x.init(&mut s, 2.5)?;
//!
//! let sim = Simulator::new(SimulatorConfig::default())?;
//! let dist = x.get_measurement(&sim, s.circuit(), &MeasureOptions::exact())?;
//! assert_eq!(dist[0].0, Value::Float(2.5));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod decoder;
mod error;
mod measurement;
mod variable;

pub use decoder::{CHAR_ALPHABET, CHAR_WIDTH, Decoder, MAX_NUMERIC_WIDTH, Value};
pub use error::{TypeError, TypeResult};
pub use measurement::{MeasureOptions, Measurement, get_measurement};
pub use variable::QuantumVariable;
