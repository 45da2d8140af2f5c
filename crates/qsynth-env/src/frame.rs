//! Environment frames.

use std::collections::BTreeSet;
use std::fmt;

use qsynth_ir::{ClassicalCondition, Instruction, QubitId};
use serde::{Deserialize, Serialize};

/// Identifier of an open environment, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameId(pub(crate) u32);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an environment does to the operations emitted inside it.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameKind {
    /// Compute, action, then the automatic inverse of compute.
    Conjugation,
    /// Groups the steps of [`Session::iterate`](crate::Session::iterate).
    Iteration,
    /// Every unbalanced operation gains these control qubits.
    Controlled(Vec<QubitId>),
    /// Every unbalanced gate fires only if the condition holds.
    ClassicalControl(ClassicalCondition),
    /// The body is buffered and its adjoint is emitted at exit.
    Inversion,
    /// Plain ownership scope.
    Scope,
}

impl FrameKind {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            FrameKind::Conjugation => "conjugation",
            FrameKind::Iteration => "iteration",
            FrameKind::Controlled(_) => "controlled",
            FrameKind::ClassicalControl(_) => "classical-control",
            FrameKind::Inversion => "inversion",
            FrameKind::Scope => "scope",
        }
    }
}

/// Phase of a conjugation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Operations are logged for later inversion.
    Compute,
    /// Operations pass through; the compute log is frozen.
    Action,
}

#[derive(Debug)]
pub(crate) struct Frame {
    pub id: FrameId,
    pub kind: FrameKind,
    pub label: String,
    pub phase: Phase,
    /// Qubits this frame reclaims at exit.
    pub owned: Vec<QubitId>,
    /// Owned qubits handed to the parent at exit.
    pub exported: BTreeSet<QubitId>,
    /// Qubits targeted by an operation that is unbalanced at this level.
    pub touched: BTreeSet<QubitId>,
    /// Owned qubits put into superposition by the compute phase.
    pub superposed: BTreeSet<QubitId>,
    /// Owned qubits allocated during the compute phase.
    pub compute_ancillae: BTreeSet<QubitId>,
    /// Conjugation: compute log. Inversion: buffered body with its balance flag.
    pub log: Vec<(Instruction, bool)>,
    /// Operations that reached the circuit while this frame was open.
    pub emitted: usize,
}

impl Frame {
    pub fn new(id: FrameId, kind: FrameKind, label: String) -> Self {
        Self {
            id,
            kind,
            label,
            phase: Phase::Compute,
            owned: vec![],
            exported: BTreeSet::new(),
            touched: BTreeSet::new(),
            superposed: BTreeSet::new(),
            compute_ancillae: BTreeSet::new(),
            log: vec![],
            emitted: 0,
        }
    }

    pub fn owns(&self, qubit: QubitId) -> bool {
        self.owned.contains(&qubit)
    }

    /// Whether `qubit` is referenced by state this frame still needs.
    pub fn references(&self, qubit: QubitId) -> bool {
        match &self.kind {
            FrameKind::Controlled(controls) => controls.contains(&qubit),
            FrameKind::Conjugation | FrameKind::Inversion => {
                self.log.iter().any(|(inst, _)| inst.qubits.contains(&qubit))
            }
            _ => false,
        }
    }

    /// Owned qubits that are reclaimed at exit.
    pub fn to_reclaim(&self) -> Vec<QubitId> {
        self.owned
            .iter()
            .copied()
            .filter(|q| !self.exported.contains(q))
            .collect()
    }

    /// Qubits to reclaim that fail the leak check.
    pub fn leaked(&self) -> Vec<QubitId> {
        self.to_reclaim()
            .into_iter()
            .filter(|q| self.touched.contains(q))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaked_excludes_exported() {
        let mut frame = Frame::new(FrameId(1), FrameKind::Scope, "s".into());
        frame.owned = vec![QubitId(0), QubitId(1), QubitId(2)];
        frame.touched.extend([QubitId(0), QubitId(1), QubitId(7)]);
        frame.exported.insert(QubitId(1));
        assert_eq!(frame.to_reclaim(), vec![QubitId(0), QubitId(2)]);
        assert_eq!(frame.leaked(), vec![QubitId(0)]);
    }

    #[test]
    fn test_controlled_frame_references_controls() {
        let frame = Frame::new(
            FrameId(2),
            FrameKind::Controlled(vec![QubitId(4)]),
            "c".into(),
        );
        assert!(frame.references(QubitId(4)));
        assert!(!frame.references(QubitId(5)));
        assert_eq!(format!("{}", frame.id), "#2");
    }
}
