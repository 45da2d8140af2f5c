//! Scoped environments with automatic uncomputation.
//!
//! A [`Session`] builds a circuit through a stack of environments. Each
//! environment changes what happens to the operations emitted inside it and
//! checks, when it closes, that every qubit it reclaims is back in |0>.
//!
//! | Environment | Effect |
//! |-------------|--------|
//! | conjugation | compute, action, then the adjoint of compute |
//! | iteration | one shared predicate evaluation per step |
//! | controlled | adds control qubits to unbalanced operations |
//! | classical control | conditions unbalanced gates on measured bits |
//! | inversion | emits the adjoint of its body |
//! | scope | ownership only |
//!
//! # Example
//!
//! ```
//! use qsynth_env::{EnvError, EnvResult, Session};
//!
//! let mut s = Session::named("and");
//! let a = s.allocate(2, "a")?;
//! let out = s.allocate(1, "out")?[0];
//!
//! // The Toffoli into the ancilla is undone automatically.
//! s.conjugate(
//!     "and",
//!     |s| -> EnvResult<_> {
//!         let anc = s.allocate(1, "anc")?[0];
//!         s.ccx(a[0], a[1], anc)?;
//!         Ok(anc)
//!     },
//!     |s, anc| s.cx(anc, out),
//! )?;
//!
//! let circuit = s.finish()?;
//! assert_eq!(circuit.num_ops(), 3);
//! # Ok::<(), EnvError>(())
//! ```
//!
//! Environments must close in LIFO order. The closure helpers guarantee it;
//! with [`Session::enter`] and [`Session::exit`] an out-of-order exit is a
//! [`EnvError::ScopeViolation`] and poisons the session.

pub mod config;
mod environments;
pub mod error;
pub mod frame;
pub mod inverse;
mod iteration;
mod session;

pub use config::SessionConfig;
pub use error::{EnvError, EnvResult};
pub use frame::{FrameId, FrameKind, Phase};
pub use inverse::{ADJOINT_SUFFIX, adjoint_label, inverse_gate, inverse_instruction};
pub use iteration::{IterationReport, IterationStrategy};
pub use session::Session;
