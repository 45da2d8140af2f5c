//! Dependency graph over a circuit's operation log.
//!
//! The circuit itself is an append-only list of instructions; this graph
//! records which operations depend on which along each qubit and classical
//! wire. It is what depth and layering are computed from.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex as PetNodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{ClbitId, QubitId};

/// Node index type for the circuit DAG.
pub type NodeIndex = PetNodeIndex<u32>;

/// A node in the circuit DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DagNode {
    /// Input node for a wire.
    In(WireId),
    /// Output node for a wire.
    Out(WireId),
    /// Operation node, holding the position in the operation log.
    Op(usize),
}

impl DagNode {
    /// Position in the operation log if this is an operation node.
    #[inline]
    pub fn op_index(&self) -> Option<usize> {
        match self {
            DagNode::Op(i) => Some(*i),
            _ => None,
        }
    }
}

/// Identifier for a wire in the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireId {
    /// A quantum wire.
    Qubit(QubitId),
    /// A classical wire.
    Clbit(ClbitId),
}

impl From<QubitId> for WireId {
    fn from(q: QubitId) -> Self {
        WireId::Qubit(q)
    }
}

impl From<ClbitId> for WireId {
    fn from(c: ClbitId) -> Self {
        WireId::Clbit(c)
    }
}

/// An edge in the circuit DAG representing a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DagEdge {
    /// The wire this edge represents.
    pub wire: WireId,
}

/// DAG view of a circuit.
///
/// Each wire has exactly one input and one output node. `wire_front` maps each
/// wire to the node just before its output, so appending an operation is O(1)
/// per operand.
#[derive(Debug, Clone, Default)]
pub struct CircuitDag {
    graph: DiGraph<DagNode, DagEdge, u32>,
    outputs: FxHashMap<WireId, NodeIndex>,
    wire_front: FxHashMap<WireId, NodeIndex>,
    num_qubits: usize,
    num_clbits: usize,
    num_ops: usize,
}

impl CircuitDag {
    /// Create a new empty circuit DAG.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a qubit wire. Adding an existing wire is a no-op.
    pub fn add_qubit(&mut self, qubit: QubitId) {
        if self.add_wire(WireId::Qubit(qubit)) {
            self.num_qubits += 1;
        }
    }

    /// Add a classical wire. Adding an existing wire is a no-op.
    pub fn add_clbit(&mut self, clbit: ClbitId) {
        if self.add_wire(WireId::Clbit(clbit)) {
            self.num_clbits += 1;
        }
    }

    fn add_wire(&mut self, wire: WireId) -> bool {
        if self.outputs.contains_key(&wire) {
            return false;
        }
        let in_node = self.graph.add_node(DagNode::In(wire));
        let out_node = self.graph.add_node(DagNode::Out(wire));
        self.graph.add_edge(in_node, out_node, DagEdge { wire });
        self.outputs.insert(wire, out_node);
        self.wire_front.insert(wire, in_node);
        true
    }

    /// Check an instruction against the registered wires.
    #[allow(clippy::cast_possible_truncation)]
    pub fn validate(&self, instruction: &Instruction) -> IrResult<()> {
        let gate_name = match &instruction.kind {
            InstructionKind::Gate(gate) => Some(gate.name().to_string()),
            _ => None,
        };

        if let InstructionKind::Gate(gate) = &instruction.kind {
            let expected = gate.num_qubits() as usize;
            let got = instruction.qubits.len();
            if expected != got {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: expected as u32,
                    got: got as u32,
                });
            }
        }
        if instruction.is_measure() && instruction.qubits.len() != instruction.clbits.len() {
            return Err(IrError::InvalidDag(format!(
                "measure: {} qubits but {} clbits",
                instruction.qubits.len(),
                instruction.clbits.len()
            )));
        }

        let mut seen = FxHashSet::default();
        for &qubit in &instruction.qubits {
            if !self.outputs.contains_key(&WireId::Qubit(qubit)) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        for clbit in instruction.classical_wires() {
            if !self.outputs.contains_key(&WireId::Clbit(clbit)) {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    gate_name: gate_name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Append the operation at log position `index`.
    pub fn apply(&mut self, index: usize, instruction: &Instruction) -> IrResult<NodeIndex> {
        self.validate(instruction)?;

        let op_node = self.graph.add_node(DagNode::Op(index));
        let wires = instruction
            .qubits
            .iter()
            .map(|&q| WireId::Qubit(q))
            .chain(instruction.classical_wires().into_iter().map(WireId::Clbit));

        for wire in wires {
            let out_node = self.outputs[&wire];
            let prev_node = self.wire_front[&wire];

            let eid = self
                .graph
                .edges_directed(prev_node, Direction::Outgoing)
                .find(|e| e.weight().wire == wire && e.target() == out_node)
                .map(|e| e.id())
                .ok_or_else(|| {
                    IrError::InvalidDag(format!(
                        "Missing edge from predecessor to output for wire {wire:?}"
                    ))
                })?;
            self.graph.remove_edge(eid);
            self.graph.add_edge(prev_node, op_node, DagEdge { wire });
            self.graph.add_edge(op_node, out_node, DagEdge { wire });
            self.wire_front.insert(wire, op_node);
        }

        self.num_ops += 1;
        Ok(op_node)
    }

    /// Number of qubit wires.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of classical wires.
    #[inline]
    pub fn num_clbits(&self) -> usize {
        self.num_clbits
    }

    /// Number of operation nodes.
    #[inline]
    pub fn num_ops(&self) -> usize {
        self.num_ops
    }

    /// ASAP layer of every operation, indexed by log position.
    pub fn layers(&self) -> IrResult<Vec<usize>> {
        let order = petgraph::algo::toposort(&self.graph, None)
            .map_err(|_| IrError::InvalidDag("cycle detected in circuit graph".into()))?;

        let mut depths: FxHashMap<NodeIndex, usize> =
            FxHashMap::with_capacity_and_hasher(self.graph.node_count(), Default::default());
        let mut layers = vec![0; self.num_ops];

        for node in order {
            let max_pred = self
                .graph
                .edges_directed(node, Direction::Incoming)
                .map(|e| depths.get(&e.source()).copied().unwrap_or(0))
                .max()
                .unwrap_or(0);
            let depth = match self.graph[node] {
                DagNode::Op(i) => {
                    if let Some(slot) = layers.get_mut(i) {
                        *slot = max_pred + 1;
                    }
                    max_pred + 1
                }
                _ => max_pred,
            };
            depths.insert(node, depth);
        }
        Ok(layers)
    }

    /// Longest path through the graph, counted in operations.
    pub fn depth(&self) -> IrResult<usize> {
        Ok(self.layers()?.into_iter().max().unwrap_or(0))
    }

    /// Operation log positions in a topological order.
    pub fn topological_ops(&self) -> IrResult<Vec<usize>> {
        let order = petgraph::algo::toposort(&self.graph, None)
            .map_err(|_| IrError::InvalidDag("cycle detected in circuit graph".into()))?;
        Ok(order
            .into_iter()
            .filter_map(|n| self.graph[n].op_index())
            .collect())
    }

    /// Get a reference to the underlying graph.
    pub fn graph(&self) -> &DiGraph<DagNode, DagEdge, u32> {
        &self.graph
    }

    /// Verify that every wire runs as one unbroken path from its input to its
    /// output node.
    pub fn verify_integrity(&self) -> IrResult<()> {
        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(IrError::InvalidDag("Graph contains a cycle".into()));
        }
        for (&wire, &out) in &self.outputs {
            let mut node = out;
            let mut steps = 0usize;
            loop {
                let preds: Vec<_> = self
                    .graph
                    .edges_directed(node, Direction::Incoming)
                    .filter(|e| e.weight().wire == wire)
                    .map(|e| e.source())
                    .collect();
                match preds.as_slice() {
                    [] => break,
                    [p] => node = *p,
                    _ => {
                        return Err(IrError::InvalidDag(format!(
                            "wire {wire:?} forks at node {node:?}"
                        )));
                    }
                }
                steps += 1;
                if steps > self.graph.node_count() {
                    return Err(IrError::InvalidDag(format!("wire {wire:?} loops")));
                }
            }
            if self.graph[node] != DagNode::In(wire) {
                return Err(IrError::InvalidDag(format!(
                    "wire {wire:?} does not start at its input node"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{ClassicalCondition, Gate, StandardGate};

    fn dag_with(qubits: u32, clbits: u32) -> CircuitDag {
        let mut dag = CircuitDag::new();
        for q in 0..qubits {
            dag.add_qubit(QubitId(q));
        }
        for c in 0..clbits {
            dag.add_clbit(ClbitId(c));
        }
        dag
    }

    #[test]
    fn test_empty_dag() {
        let dag = CircuitDag::new();
        assert_eq!(dag.num_qubits(), 0);
        assert_eq!(dag.num_ops(), 0);
        assert_eq!(dag.depth().unwrap(), 0);
    }

    #[test]
    fn test_parallel_gates_depth() {
        let mut dag = dag_with(4, 0);
        let ops = [
            Instruction::gate(StandardGate::H, [QubitId(0)]),
            Instruction::gate(StandardGate::H, [QubitId(1)]),
            Instruction::gate(StandardGate::CX, [QubitId(2), QubitId(3)]),
            Instruction::gate(StandardGate::CX, [QubitId(0), QubitId(1)]),
        ];
        for (i, op) in ops.iter().enumerate() {
            dag.apply(i, op).unwrap();
        }
        assert_eq!(dag.layers().unwrap(), vec![1, 1, 1, 2]);
        assert_eq!(dag.depth().unwrap(), 2);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_condition_orders_after_measure() {
        let mut dag = dag_with(2, 1);
        dag.apply(0, &Instruction::measure(QubitId(0), ClbitId(0)))
            .unwrap();
        let cond = Gate::standard(StandardGate::X)
            .with_condition(ClassicalCondition::new(&[ClbitId(0)], 1));
        dag.apply(1, &Instruction::gate(cond, [QubitId(1)])).unwrap();
        assert_eq!(dag.layers().unwrap(), vec![1, 2]);
        assert_eq!(dag.topological_ops().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_gate_arity_mismatch() {
        let mut dag = dag_with(2, 0);
        let bad = Instruction::gate(StandardGate::CX, [QubitId(0)]);
        let err = dag.apply(0, &bad).unwrap_err();
        assert!(matches!(
            err,
            IrError::QubitCountMismatch {
                expected: 2,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_qubit_not_found_with_context() {
        let mut dag = dag_with(1, 0);
        let inst = Instruction::gate(StandardGate::H, [QubitId(5)]);
        let err = dag.apply(0, &inst).unwrap_err();
        assert!(err.to_string().contains("gate: h"));
    }

    #[test]
    fn test_duplicate_operand() {
        let mut dag = dag_with(2, 0);
        let inst = Instruction::gate(StandardGate::CX, [QubitId(1), QubitId(1)]);
        assert!(matches!(
            dag.apply(0, &inst),
            Err(IrError::DuplicateQubit { .. })
        ));
    }
}
