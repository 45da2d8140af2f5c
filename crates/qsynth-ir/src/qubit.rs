//! Qubit and classical bit handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a qubit.
///
/// Handles are issued by the [`QubitAllocator`](crate::QubitAllocator); the
/// circuit only ever references them. Ordering is by index, which is what the
/// allocator's lowest-index-first reuse relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl QubitId {
    /// The raw index of this qubit.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

/// Handle to a classical bit written by a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl ClbitId {
    /// The raw index of this bit.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClbitId {
    fn from(id: u32) -> Self {
        ClbitId(id)
    }
}

/// A qubit as registered in a circuit, with the name of the variable that
/// first claimed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Qubit {
    /// The handle.
    pub id: QubitId,
    /// Register (variable) name, if any.
    pub register: Option<String>,
    /// Position inside the register.
    pub index: Option<u32>,
}

impl Qubit {
    /// A bare qubit.
    pub fn new(id: QubitId) -> Self {
        Self {
            id,
            register: None,
            index: None,
        }
    }

    /// A qubit that belongs to a named register.
    pub fn with_register(id: QubitId, register: impl Into<String>, index: u32) -> Self {
        Self {
            id,
            register: Some(register.into()),
            index: Some(index),
        }
    }
}

impl fmt::Display for Qubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.register, self.index) {
            (Some(reg), Some(idx)) => write!(f, "{reg}[{idx}]"),
            _ => write!(f, "{}", self.id),
        }
    }
}

/// A classical bit registered in a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clbit {
    /// The handle.
    pub id: ClbitId,
    /// The qubit whose measurement produced this bit, if known.
    pub source: Option<QubitId>,
}

impl Clbit {
    /// A classical bit without a recorded source.
    pub fn new(id: ClbitId) -> Self {
        Self { id, source: None }
    }

    /// A classical bit produced by measuring `qubit`.
    pub fn measured_from(id: ClbitId, qubit: QubitId) -> Self {
        Self {
            id,
            source: Some(qubit),
        }
    }
}

impl fmt::Display for Clbit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            Some(q) => write!(f, "{}<-{q}", self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qubit_display() {
        let q = Qubit::new(QubitId(0));
        assert_eq!(format!("{q}"), "q0");

        let q_reg = Qubit::with_register(QubitId(1), "x", 0);
        assert_eq!(format!("{q_reg}"), "x[0]");
    }

    #[test]
    fn test_clbit_display() {
        let c = Clbit::new(ClbitId(0));
        assert_eq!(format!("{c}"), "c0");

        let c_src = Clbit::measured_from(ClbitId(2), QubitId(5));
        assert_eq!(format!("{c_src}"), "c2<-q5");
    }

    #[test]
    fn test_qubit_ordering() {
        assert!(QubitId(1) < QubitId(2));
        assert_eq!(QubitId(7).index(), 7);
    }
}
