//! Quantum variables.

use qsynth_env::Session;
use qsynth_ir::QubitId;
use qsynth_sim::OutputRegister;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decoder::{CHAR_WIDTH, Decoder, Value};
use crate::error::TypeResult;

/// A named group of qubits with a decoding for its measured pattern.
///
/// The qubits are ordered from least significant (index 0) to most
/// significant. A variable does not own its qubits: they belong to the
/// environment that was innermost when it was allocated, and are reclaimed
/// when that environment exits unless exported.
///
/// # Example
///
/// ```
/// use qsynth_env::Session;
/// use qsynth_types::QuantumVariable;
///
/// let mut s = Session::named("init");
/// let x = QuantumVariable::integer(&mut s, "x", 4)?;
/// x.init(&mut s, 5i64)?;
/// assert_eq!(s.circuit().num_ops(), 2);
/// # Ok::<(), qsynth_types::TypeError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumVariable {
    name: String,
    qubits: Vec<QubitId>,
    decoder: Decoder,
}

impl QuantumVariable {
    /// Allocate a fresh variable of `width` qubits in |0>.
    pub fn new(
        session: &mut Session,
        name: impl Into<String>,
        width: usize,
        decoder: Decoder,
    ) -> TypeResult<Self> {
        decoder.validate_width(width)?;
        let name = name.into();
        let qubits = session.allocate(width as u32, &name)?;
        debug!(name = %name, width, decoder = decoder.name(), "allocated variable");
        Ok(Self {
            name,
            qubits,
            decoder,
        })
    }

    /// Unsigned integer variable.
    pub fn integer(session: &mut Session, name: impl Into<String>, width: usize) -> TypeResult<Self> {
        Self::new(session, name, width, Decoder::Integer { signed: false })
    }

    /// Two's complement integer variable.
    pub fn signed(session: &mut Session, name: impl Into<String>, width: usize) -> TypeResult<Self> {
        Self::new(session, name, width, Decoder::Integer { signed: true })
    }

    /// Fixed-point variable with resolution `2^exponent`.
    pub fn fixed(
        session: &mut Session,
        name: impl Into<String>,
        width: usize,
        exponent: i32,
        signed: bool,
    ) -> TypeResult<Self> {
        Self::new(session, name, width, Decoder::Fixed { exponent, signed })
    }

    /// Single-qubit boolean.
    pub fn boolean(session: &mut Session, name: impl Into<String>) -> TypeResult<Self> {
        Self::new(session, name, 1, Decoder::Boolean)
    }

    /// Five-qubit character.
    pub fn char(session: &mut Session, name: impl Into<String>) -> TypeResult<Self> {
        Self::new(session, name, CHAR_WIDTH, Decoder::Char)
    }

    /// Raw bit pattern.
    pub fn bitstring(session: &mut Session, name: impl Into<String>, width: usize) -> TypeResult<Self> {
        Self::new(session, name, width, Decoder::Bitstring)
    }

    /// Wrap existing qubits.
    pub fn from_qubits(
        name: impl Into<String>,
        qubits: Vec<QubitId>,
        decoder: Decoder,
    ) -> TypeResult<Self> {
        decoder.validate_width(qubits.len())?;
        Ok(Self {
            name: name.into(),
            qubits,
            decoder,
        })
    }

    /// Variable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qubits, least significant first.
    pub fn qubits(&self) -> &[QubitId] {
        &self.qubits
    }

    /// Number of qubits.
    pub fn width(&self) -> usize {
        self.qubits.len()
    }

    /// The decoding.
    pub fn decoder(&self) -> Decoder {
        self.decoder
    }

    /// Qubit at bit position `index`.
    pub fn bit(&self, index: usize) -> Option<QubitId> {
        self.qubits.get(index).copied()
    }

    /// Same qubits read with another decoding.
    pub fn with_decoder(&self, decoder: Decoder) -> TypeResult<Self> {
        Self::from_qubits(self.name.clone(), self.qubits.clone(), decoder)
    }

    /// Decode a raw measured pattern.
    pub fn decode(&self, raw: u64) -> Value {
        self.decoder.decode(raw, self.width())
    }

    /// Encode a value as a raw pattern.
    pub fn encode(&self, value: &Value) -> TypeResult<u64> {
        self.decoder.encode(value, self.width())
    }

    /// Prepare the basis state holding `value`.
    ///
    /// Applies `X` to every set bit; the variable must be in |0>.
    pub fn init(&self, session: &mut Session, value: impl Into<Value>) -> TypeResult<()> {
        let raw = self.encode(&value.into())?;
        for (i, &q) in self.qubits.iter().enumerate() {
            if (raw >> i) & 1 == 1 {
                session.x(q)?;
            }
        }
        Ok(())
    }

    /// Hand the variable's qubits to the enclosing environment.
    pub fn export(&self, session: &mut Session) -> TypeResult<()> {
        session.export(&self.qubits)?;
        Ok(())
    }

    /// Return the variable's qubits to the allocator.
    ///
    /// Refused while any of them may still hold a value.
    pub fn release(self, session: &mut Session) -> TypeResult<()> {
        session.release(&self.qubits)?;
        Ok(())
    }

    /// Simulator read-out register for this variable.
    pub fn output_register(&self) -> OutputRegister {
        OutputRegister {
            name: self.name.clone(),
            qubits: self.qubits.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TypeError;
    use qsynth_env::EnvError;
    use qsynth_ir::ResourceError;

    #[test]
    fn test_integer_allocates_width() {
        let mut s = Session::named("t");
        let x = QuantumVariable::integer(&mut s, "x", 4).unwrap();
        assert_eq!(x.width(), 4);
        assert_eq!(x.bit(0), Some(QubitId(0)));
        assert_eq!(s.circuit().qubits()[3].to_string(), "x[3]");
    }

    #[test]
    fn test_init_sets_bits() {
        let mut s = Session::named("t");
        let x = QuantumVariable::signed(&mut s, "x", 4).unwrap();
        x.init(&mut s, -3i64).unwrap();
        // -3 is 0b1101
        let targets: Vec<_> = s
            .circuit()
            .instructions()
            .iter()
            .map(|i| i.qubits[0])
            .collect();
        assert_eq!(targets, vec![QubitId(0), QubitId(2), QubitId(3)]);
    }

    #[test]
    fn test_init_overflow_emits_nothing() {
        let mut s = Session::named("t");
        let x = QuantumVariable::integer(&mut s, "x", 3).unwrap();
        assert!(matches!(x.init(&mut s, 8i64), Err(TypeError::Overflow { .. })));
        assert!(s.circuit().instructions().is_empty());
    }

    #[test]
    fn test_char_variable() {
        let mut s = Session::named("t");
        let c = QuantumVariable::char(&mut s, "c").unwrap();
        c.init(&mut s, 'e').unwrap();
        assert_eq!(c.decode(4), Value::Char('e'));
    }

    #[test]
    fn test_invalid_width_allocates_nothing() {
        let mut s = Session::named("t");
        assert!(QuantumVariable::integer(&mut s, "x", 0).is_err());
        assert_eq!(s.allocator().num_allocated(), 0);
    }

    #[test]
    fn test_scope_reclaims_unexported_variable() {
        let mut s = Session::named("t");
        let kept = s
            .scope("make", |s| -> TypeResult<QuantumVariable> {
                QuantumVariable::boolean(s, "tmp")?;
                let out = QuantumVariable::integer(s, "out", 2)?;
                out.init(s, 2i64)?;
                out.export(s)?;
                Ok(out)
            })
            .unwrap();
        assert_eq!(s.allocator().num_allocated(), 2);
        assert!(s.allocator().is_live(kept.qubits()[1]));
    }

    #[test]
    fn test_release_twice_fails() {
        let mut s = Session::named("t");
        let x = QuantumVariable::integer(&mut s, "x", 2).unwrap();
        x.clone().release(&mut s).unwrap();
        assert!(matches!(
            x.release(&mut s),
            Err(TypeError::Env(EnvError::Resource(ResourceError::NotAllocated(_))))
        ));
    }
}
