//! Circuit instructions combining gates with operands.

use serde::{Deserialize, Serialize};

use crate::gate::Gate;
use crate::qubit::{ClbitId, QubitId};

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A unitary gate.
    Gate(Gate),
    /// Computational-basis measurement of one qubit into one classical bit.
    Measure,
    /// Scheduling barrier. Has no effect on the state.
    Barrier,
}

/// An immutable operation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on. Controls come first.
    pub qubits: Vec<QubitId>,
    /// Classical bits written (measurement only).
    pub clbits: Vec<ClbitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: impl Into<Gate>, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate.into()),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: InstructionKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
        }
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Barrier,
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self.kind, InstructionKind::Measure)
    }

    /// Check if this is a barrier.
    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, InstructionKind::Barrier)
    }

    /// Whether execution depends on measured classical bits.
    pub fn is_conditional(&self) -> bool {
        self.as_gate().is_some_and(|g| g.condition.is_some())
    }

    /// Get the gate if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&Gate> {
        match &self.kind {
            InstructionKind::Gate(g) => Some(g),
            _ => None,
        }
    }

    /// The gate's label, if any.
    pub fn label(&self) -> Option<&str> {
        self.as_gate().and_then(|g| g.label.as_deref())
    }

    /// Classical bits this instruction reads or writes.
    pub fn classical_wires(&self) -> Vec<ClbitId> {
        let mut wires = self.clbits.clone();
        if let Some(cond) = self.as_gate().and_then(|g| g.condition.as_ref()) {
            wires.extend(cond.clbits());
        }
        wires.sort_unstable();
        wires.dedup();
        wires
    }

    /// Get the name of the instruction.
    pub fn name(&self) -> &str {
        match &self.kind {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Measure => "measure",
            InstructionKind::Barrier => "barrier",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{ClassicalCondition, StandardGate};

    #[test]
    fn test_gate_instruction() {
        let inst = Instruction::gate(StandardGate::H, [QubitId(0)]);
        assert!(inst.is_gate());
        assert_eq!(inst.qubits.len(), 1);
        assert_eq!(inst.name(), "h");
        assert!(!inst.is_conditional());
    }

    #[test]
    fn test_measure_instruction() {
        let inst = Instruction::measure(QubitId(0), ClbitId(0));
        assert!(inst.is_measure());
        assert_eq!(inst.classical_wires(), vec![ClbitId(0)]);
    }

    #[test]
    fn test_conditional_gate_reads_clbits() {
        let gate = Gate::standard(StandardGate::X)
            .with_condition(ClassicalCondition::new(&[ClbitId(3), ClbitId(1)], 1));
        let inst = Instruction::gate(gate, [QubitId(0)]);
        assert!(inst.is_conditional());
        assert_eq!(inst.classical_wires(), vec![ClbitId(1), ClbitId(3)]);
    }

    #[test]
    fn test_barrier_instruction() {
        let inst = Instruction::barrier([QubitId(0), QubitId(1), QubitId(2)]);
        assert!(inst.is_barrier());
        assert_eq!(inst.qubits.len(), 3);
    }
}
