//! Arithmetic circuit synthesis for qsynth.
//!
//! Every fragment emits into a [`Session`] and leaves its scratch qubits
//! clean: work registers are borrowed inside an environment and returned to
//! the allocator when it closes.
//!
//! - [`add_constant`], [`add`], [`ripple_add`] and [`lookahead_add`]: adders
//! - [`gidney_add`] and [`gidney_add_controlled`]: in-place adders with
//!   measurement-based carry erasure
//! - [`mod_multiply`], [`mod_exp_step`] and [`mod_exp`]: modular arithmetic
//! - [`cyclic_shift`]: rotation of a cell list by a quantum offset
//!
//! # Example
//!
//! ```
//! use qsynth_arith::mod_multiply;
//! use qsynth_env::Session;
//! use qsynth_sim::{Simulator, SimulatorConfig};
//! use qsynth_types::{MeasureOptions, QuantumVariable, Value};
//!
//! let mut s = Session::named("modmul");
//! let x = QuantumVariable::integer(&mut s, "x", 3)?;
//! x.init(&mut s, 5i64)?;
//! mod_multiply(&mut s, &x, 3, 7, &[])?;
//!
//! let sim = Simulator::new(SimulatorConfig::default())?;
//! let dist = x.get_measurement(&sim, s.circuit(), &MeasureOptions::exact())?;
//! assert_eq!(dist[0].0, Value::Int(1));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod adder;
pub mod error;
pub mod fourier;
mod modular;
mod shift;

use qsynth_env::Session;
use qsynth_ir::QubitId;

pub use adder::{
    add, add_constant, gidney_add, gidney_add_controlled, lookahead_add, ripple_add,
};
pub use error::{MAX_WIDTH, SynthResult, SynthesisError};
pub use modular::{
    gcd, mod_add_constant, mod_exp, mod_exp_step, mod_inverse, mod_multiply, mul_mod,
    pow2_power_mod,
};
pub use shift::{ShiftStrategy, cyclic_shift, cyclic_shift_by, cyclic_shift_with};

/// Run `body` controlled on `controls`, or plainly when there are none.
pub(crate) fn controlled<R>(
    session: &mut Session,
    controls: &[QubitId],
    body: impl FnOnce(&mut Session) -> SynthResult<R>,
) -> SynthResult<R> {
    if controls.is_empty() {
        body(session)
    } else {
        session.control(controls, body)
    }
}
