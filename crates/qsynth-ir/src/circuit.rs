//! The circuit graph: an append-only operation log plus its allocation
//! timeline.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dag::CircuitDag;
use crate::error::{IrError, IrResult};
use crate::gate::{Gate, StandardGate};
use crate::instruction::Instruction;
use crate::parameter::ParameterExpression;
use crate::qubit::{Clbit, ClbitId, Qubit, QubitId};

/// One entry of the allocation timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationEvent {
    /// `qubit` became live before the operation at index `at`.
    Allocate {
        /// The qubit.
        qubit: QubitId,
        /// Operation index at which the event happened.
        at: usize,
    },
    /// `qubit` was reclaimed before the operation at index `at`.
    Release {
        /// The qubit.
        qubit: QubitId,
        /// Operation index at which the event happened.
        at: usize,
    },
}

/// A quantum circuit.
///
/// Operations are appended and never mutated. Once [`Circuit::finish`] is
/// called the circuit is read-only and can be handed to consumers.
#[derive(Debug, Clone)]
pub struct Circuit {
    name: String,
    qubits: Vec<Qubit>,
    clbits: Vec<Clbit>,
    instructions: Vec<Instruction>,
    dag: CircuitDag,
    timeline: Vec<AllocationEvent>,
    finished: bool,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qubits: vec![],
            clbits: vec![],
            instructions: vec![],
            dag: CircuitDag::new(),
            timeline: vec![],
            finished: false,
        }
    }

    /// Create a circuit with qubits `0..num_qubits` and clbits `0..num_clbits`
    /// already registered.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut circuit = Self::new(name);
        for q in 0..num_qubits {
            circuit.register_qubit(Qubit::new(QubitId(q)));
        }
        for _ in 0..num_clbits {
            circuit.add_clbit(None);
        }
        circuit
    }

    /// Register a qubit that has just been allocated.
    ///
    /// A reused id keeps its original registry entry; only the timeline grows.
    pub fn register_qubit(&mut self, qubit: Qubit) {
        let id = qubit.id;
        if !self.qubits.iter().any(|q| q.id == id) {
            self.dag.add_qubit(id);
            self.qubits.push(qubit);
        }
        self.timeline.push(AllocationEvent::Allocate {
            qubit: id,
            at: self.instructions.len(),
        });
    }

    /// Record that qubits were reclaimed at the current position.
    pub fn record_release(&mut self, qubits: &[QubitId]) {
        let at = self.instructions.len();
        self.timeline.extend(
            qubits
                .iter()
                .map(|&qubit| AllocationEvent::Release { qubit, at }),
        );
    }

    /// Add a classical bit, optionally recording the qubit it measures.
    pub fn add_clbit(&mut self, source: Option<QubitId>) -> ClbitId {
        let id = ClbitId(self.clbits.len() as u32);
        let clbit = match source {
            Some(q) => Clbit::measured_from(id, q),
            None => Clbit::new(id),
        };
        self.clbits.push(clbit);
        self.dag.add_clbit(id);
        id
    }

    /// Append an instruction, returning its position in the log.
    pub fn push(&mut self, instruction: Instruction) -> IrResult<usize> {
        if self.finished {
            return Err(IrError::Finished(self.name.clone()));
        }
        let index = self.instructions.len();
        self.dag.apply(index, &instruction)?;
        self.instructions.push(instruction);
        Ok(index)
    }

    /// Seal the circuit.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Whether the circuit is sealed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // =========================================================================
    // Gate builders
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::H, [qubit]))?;
        Ok(self)
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::X, [qubit]))?;
        Ok(self)
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::Z, [qubit]))?;
        Ok(self)
    }

    /// Apply Rx rotation gate.
    pub fn rx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::Rx(theta.into()), [qubit]))?;
        Ok(self)
    }

    /// Apply Ry rotation gate.
    pub fn ry(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::Ry(theta.into()), [qubit]))?;
        Ok(self)
    }

    /// Apply phase gate.
    pub fn p(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::P(theta.into()), [qubit]))?;
        Ok(self)
    }

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::CX, [control, target]))?;
        Ok(self)
    }

    /// Apply controlled-phase gate.
    pub fn cp(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::CP(theta.into()), [control, target]))?;
        Ok(self)
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::Swap, [q1, q2]))?;
        Ok(self)
    }

    /// Apply Toffoli (CCX) gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::gate(StandardGate::CCX, [c1, c2, target]))?;
        Ok(self)
    }

    /// Apply any gate.
    pub fn gate(
        &mut self,
        gate: impl Into<Gate>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.push(Instruction::gate(gate, qubits))?;
        Ok(self)
    }

    /// Measure a qubit into a fresh classical bit.
    pub fn measure(&mut self, qubit: QubitId) -> IrResult<ClbitId> {
        let clbit = self.add_clbit(Some(qubit));
        self.push(Instruction::measure(qubit, clbit))?;
        Ok(clbit)
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.push(Instruction::barrier(qubits))?;
        Ok(self)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The operation log in emission order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of distinct qubits ever registered.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Width of a state vector able to hold every qubit id used.
    pub fn width(&self) -> usize {
        self.qubits
            .iter()
            .map(|q| q.id.index() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.clbits.len()
    }

    /// Number of operations.
    pub fn num_ops(&self) -> usize {
        self.instructions.len()
    }

    /// Get the circuit depth.
    pub fn depth(&self) -> usize {
        // Append-only construction cannot introduce a cycle.
        self.dag.depth().unwrap_or_default()
    }

    /// Get a reference to the dependency graph.
    pub fn dag(&self) -> &CircuitDag {
        &self.dag
    }

    /// Registered qubits.
    pub fn qubits(&self) -> &[Qubit] {
        &self.qubits
    }

    /// Registered classical bits.
    pub fn clbits(&self) -> &[Clbit] {
        &self.clbits
    }

    /// Allocation and release events in order.
    pub fn timeline(&self) -> &[AllocationEvent] {
        &self.timeline
    }

    /// Whether the circuit needs mid-circuit measurement support: a gate acts
    /// after a measurement on the same qubit, or a gate has a classical
    /// condition.
    pub fn is_dynamic(&self) -> bool {
        let mut measured = BTreeSet::new();
        for inst in &self.instructions {
            if inst.is_conditional() {
                return true;
            }
            if inst.is_measure() {
                measured.extend(inst.qubits.iter().copied());
            } else if inst.is_gate() && inst.qubits.iter().any(|q| measured.contains(q)) {
                return true;
            }
        }
        false
    }

    /// Whether any measurement appears in the circuit.
    pub fn has_measurements(&self) -> bool {
        self.instructions.iter().any(Instruction::is_measure)
    }

    /// Free symbols across all gate parameters, sorted.
    pub fn symbols(&self) -> BTreeSet<String> {
        self.instructions
            .iter()
            .filter_map(Instruction::as_gate)
            .flat_map(|g| g.kind.parameters())
            .flat_map(ParameterExpression::symbols)
            .collect()
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit with both qubits measured.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 0);
        circuit.h(QubitId(0))?.cx(QubitId(0), QubitId(1))?;
        circuit.measure(QubitId(0))?;
        circuit.measure(QubitId(1))?;
        Ok(circuit)
    }

    /// Create an n-qubit GHZ state circuit without measurements.
    pub fn ghz(n: u32) -> IrResult<Self> {
        let mut circuit = Self::with_size("ghz", n, 0);
        if n == 0 {
            return Ok(circuit);
        }
        circuit.h(QubitId(0))?;
        for i in 0..n - 1 {
            circuit.cx(QubitId(i), QubitId(i + 1))?;
        }
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::ClassicalCondition;
    use std::f64::consts::PI;

    #[test]
    fn test_new_circuit() {
        let circuit = Circuit::new("test");
        assert_eq!(circuit.name(), "test");
        assert_eq!(circuit.num_qubits(), 0);
        assert_eq!(circuit.num_clbits(), 0);
        assert_eq!(circuit.width(), 0);
    }

    #[test]
    fn test_bell_state() {
        let circuit = Circuit::bell().unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.depth(), 3);
        assert!(!circuit.is_dynamic());
    }

    #[test]
    fn test_register_reused_qubit_keeps_registry() {
        let mut circuit = Circuit::new("reuse");
        circuit.register_qubit(Qubit::with_register(QubitId(0), "anc", 0));
        circuit.x(QubitId(0)).unwrap();
        circuit.record_release(&[QubitId(0)]);
        circuit.register_qubit(Qubit::with_register(QubitId(0), "tmp", 0));

        assert_eq!(circuit.num_qubits(), 1);
        assert_eq!(
            circuit.timeline(),
            &[
                AllocationEvent::Allocate { qubit: QubitId(0), at: 0 },
                AllocationEvent::Release { qubit: QubitId(0), at: 1 },
                AllocationEvent::Allocate { qubit: QubitId(0), at: 1 },
            ]
        );
    }

    #[test]
    fn test_finished_circuit_rejects_ops() {
        let mut circuit = Circuit::with_size("sealed", 1, 0);
        circuit.finish();
        assert!(matches!(circuit.h(QubitId(0)), Err(IrError::Finished(_))));
    }

    #[test]
    fn test_dynamic_detection() {
        let mut circuit = Circuit::with_size("mid", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        let c = circuit.measure(QubitId(0)).unwrap();
        assert!(!circuit.is_dynamic());

        let gate = Gate::standard(StandardGate::X).with_condition(ClassicalCondition::new(&[c], 1));
        circuit.gate(gate, [QubitId(1)]).unwrap();
        assert!(circuit.is_dynamic());
    }

    #[test]
    fn test_symbols() {
        let mut circuit = Circuit::with_size("param", 1, 0);
        circuit.rx(PI / 2.0, QubitId(0)).unwrap();
        circuit
            .ry(ParameterExpression::symbol("theta"), QubitId(0))
            .unwrap();
        circuit
            .p(ParameterExpression::symbol("alpha"), QubitId(0))
            .unwrap();
        let syms: Vec<_> = circuit.symbols().into_iter().collect();
        assert_eq!(syms, vec!["alpha", "theta"]);
    }

    #[test]
    fn test_fluent_api() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit
            .h(QubitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .ccx(QubitId(0), QubitId(1), QubitId(2))
            .unwrap();
        assert_eq!(circuit.depth(), 3);
        assert_eq!(circuit.num_ops(), 3);
    }
}
