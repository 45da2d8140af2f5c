//! Quantum gate types.
//!
//! Gates form a closed set: the [`StandardGate`] enum plus a generic
//! multi-controlled lifting of any standard gate. Control qubits always come
//! first in an instruction's operand list.

use serde::{Deserialize, Serialize};

use crate::parameter::ParameterExpression;
use crate::qubit::ClbitId;

/// Standard gates with known semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),
    /// Phase gate diag(1, e^{iθ}).
    P(ParameterExpression),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// Controlled rotation around X.
    CRx(ParameterExpression),
    /// Controlled rotation around Y.
    CRy(ParameterExpression),
    /// Controlled rotation around Z.
    CRz(ParameterExpression),
    /// Controlled phase gate.
    CP(ParameterExpression),

    // Three-qubit gates
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

/// How a gate acts on its non-control operands in the computational basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAction {
    /// Diagonal: only phases change, basis states are preserved.
    Diagonal,
    /// Permutes basis states (up to phase) without creating superposition.
    Permutation,
    /// May create superposition.
    General,
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(_, _, _) => "u",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::Swap => "swap",
            StandardGate::CRx(_) => "crx",
            StandardGate::CRy(_) => "cry",
            StandardGate::CRz(_) => "crz",
            StandardGate::CP(_) => "cp",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        let (root, controls) = self.split_controls();
        controls + root.root_width()
    }

    #[inline]
    fn root_width(&self) -> u32 {
        match self {
            StandardGate::Swap => 2,
            _ => 1,
        }
    }

    /// Check if this gate has free symbols in its parameters.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Get parameters of this gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRx(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p) => vec![p],

            StandardGate::U(a, b, c) => vec![a, b, c],

            _ => vec![],
        }
    }

    /// Split into the uncontrolled root gate and the number of built-in
    /// controls, e.g. `CCX` becomes `(X, 2)`.
    pub fn split_controls(&self) -> (StandardGate, u32) {
        match self {
            StandardGate::CX => (StandardGate::X, 1),
            StandardGate::CY => (StandardGate::Y, 1),
            StandardGate::CZ => (StandardGate::Z, 1),
            StandardGate::CH => (StandardGate::H, 1),
            StandardGate::CRx(t) => (StandardGate::Rx(t.clone()), 1),
            StandardGate::CRy(t) => (StandardGate::Ry(t.clone()), 1),
            StandardGate::CRz(t) => (StandardGate::Rz(t.clone()), 1),
            StandardGate::CP(t) => (StandardGate::P(t.clone()), 1),
            StandardGate::CCX => (StandardGate::X, 2),
            StandardGate::CSwap => (StandardGate::Swap, 1),
            other => (other.clone(), 0),
        }
    }

    /// Number of leading operands that act as controls.
    #[inline]
    pub fn num_controls(&self) -> u32 {
        self.split_controls().1
    }

    /// Action on the target operands.
    pub fn target_action(&self) -> TargetAction {
        match self.split_controls().0 {
            StandardGate::I
            | StandardGate::Z
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::Rz(_)
            | StandardGate::P(_) => TargetAction::Diagonal,
            StandardGate::X | StandardGate::Y | StandardGate::Swap => TargetAction::Permutation,
            _ => TargetAction::General,
        }
    }
}

/// A standard gate lifted by an arbitrary number of control qubits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlledGate {
    /// The uncontrolled root gate.
    pub base: StandardGate,
    /// Number of control qubits.
    pub num_controls: u32,
    name: String,
}

impl ControlledGate {
    fn new(base: StandardGate, num_controls: u32) -> Self {
        let name = format!("c{num_controls}{}", base.name());
        Self {
            base,
            num_controls,
            name,
        }
    }
}

/// The operation a gate performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// A standard gate.
    Standard(StandardGate),
    /// A standard gate with extra control qubits.
    Controlled(ControlledGate),
}

impl GateKind {
    /// Build the canonical kind for `base` with `extra` additional controls.
    ///
    /// Known small shapes collapse to their named gate (`X` with two controls
    /// is `CCX`); anything larger becomes [`GateKind::Controlled`].
    pub fn with_controls(base: &GateKind, extra: u32) -> GateKind {
        let (root, n) = base.split_controls();
        Self::canonical(root, n + extra)
    }

    fn canonical(root: StandardGate, controls: u32) -> GateKind {
        let named = match (&root, controls) {
            (_, 0) => Some(root.clone()),
            (StandardGate::X, 1) => Some(StandardGate::CX),
            (StandardGate::Y, 1) => Some(StandardGate::CY),
            (StandardGate::Z, 1) => Some(StandardGate::CZ),
            (StandardGate::H, 1) => Some(StandardGate::CH),
            (StandardGate::Rx(t), 1) => Some(StandardGate::CRx(t.clone())),
            (StandardGate::Ry(t), 1) => Some(StandardGate::CRy(t.clone())),
            (StandardGate::Rz(t), 1) => Some(StandardGate::CRz(t.clone())),
            (StandardGate::P(t), 1) => Some(StandardGate::CP(t.clone())),
            (StandardGate::X, 2) => Some(StandardGate::CCX),
            (StandardGate::Swap, 1) => Some(StandardGate::CSwap),
            _ => None,
        };
        match named {
            Some(g) => GateKind::Standard(g),
            None => GateKind::Controlled(ControlledGate::new(root, controls)),
        }
    }

    /// Root gate and total number of controls.
    pub fn split_controls(&self) -> (StandardGate, u32) {
        match self {
            GateKind::Standard(g) => g.split_controls(),
            GateKind::Controlled(c) => (c.base.clone(), c.num_controls),
        }
    }

    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            GateKind::Standard(g) => g.name(),
            GateKind::Controlled(c) => &c.name,
        }
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Controlled(c) => c.num_controls + c.base.root_width(),
        }
    }

    /// Number of leading control operands.
    pub fn num_controls(&self) -> u32 {
        self.split_controls().1
    }

    /// Action on the target operands.
    pub fn target_action(&self) -> TargetAction {
        match self {
            GateKind::Standard(g) => g.target_action(),
            GateKind::Controlled(c) => c.base.target_action(),
        }
    }

    /// Parameters of the gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            GateKind::Standard(g) => g.parameters(),
            GateKind::Controlled(c) => c.base.parameters(),
        }
    }
}

/// Condition on measured classical bits.
///
/// The gate fires only when every listed bit equals its expected value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// `(bit, expected value)` terms, all of which must hold.
    pub terms: Vec<(ClbitId, bool)>,
}

impl ClassicalCondition {
    /// Condition `clbits == value`, with `clbits[0]` as the least significant bit.
    pub fn new(clbits: &[ClbitId], value: u64) -> Self {
        let terms = clbits
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i < 64 && (value >> i) & 1 == 1))
            .collect();
        Self { terms }
    }

    /// Logical AND of two conditions.
    #[must_use]
    pub fn and(&self, other: &ClassicalCondition) -> Self {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().copied());
        Self { terms }
    }

    /// Bits read by this condition.
    pub fn clbits(&self) -> impl Iterator<Item = ClbitId> + '_ {
        self.terms.iter().map(|(c, _)| *c)
    }

    /// Evaluate against a classical register readout.
    pub fn is_satisfied(&self, read: impl Fn(ClbitId) -> bool) -> bool {
        self.terms.iter().all(|&(c, expected)| read(c) == expected)
    }
}

/// A gate with associated metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The kind of gate.
    pub kind: GateKind,
    /// Optional label, used to tag the fragment that emitted the gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Optional classical condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

impl Gate {
    /// Create a new gate from a standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self::from_kind(GateKind::Standard(gate))
    }

    /// Create a gate from a kind.
    pub fn from_kind(kind: GateKind) -> Self {
        Self {
            kind,
            label: None,
            condition: None,
        }
    }

    /// A standard gate with `controls` extra control qubits.
    pub fn controlled(gate: StandardGate, controls: u32) -> Self {
        Self::from_kind(GateKind::with_controls(&GateKind::Standard(gate), controls))
    }

    /// Add a label to the gate.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a classical condition to the gate, combining with any existing one.
    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.and(&condition),
            None => condition,
        });
        self
    }

    /// Get the name of this gate.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert_eq!(StandardGate::CCX.num_qubits(), 3);
        assert_eq!(StandardGate::CSwap.num_qubits(), 3);

        assert!(!StandardGate::H.is_parameterized());
        assert!(!StandardGate::Rx(ParameterExpression::constant(PI)).is_parameterized());
        assert!(StandardGate::Rx(ParameterExpression::symbol("theta")).is_parameterized());
    }

    #[test]
    fn test_control_lifting_collapses_to_named_gates() {
        let x = GateKind::Standard(StandardGate::X);
        assert_eq!(GateKind::with_controls(&x, 1), GateKind::Standard(StandardGate::CX));
        assert_eq!(GateKind::with_controls(&x, 2), GateKind::Standard(StandardGate::CCX));

        let cx = GateKind::Standard(StandardGate::CX);
        assert_eq!(GateKind::with_controls(&cx, 1), GateKind::Standard(StandardGate::CCX));

        let mcx = GateKind::with_controls(&cx, 3);
        assert_eq!(mcx.name(), "c4x");
        assert_eq!(mcx.num_qubits(), 5);
        assert_eq!(mcx.num_controls(), 4);
    }

    #[test]
    fn test_controlled_phase_keeps_parameter() {
        let kind = GateKind::with_controls(
            &GateKind::Standard(StandardGate::CP(ParameterExpression::symbol("t"))),
            2,
        );
        assert_eq!(kind.num_qubits(), 4);
        assert_eq!(kind.parameters().len(), 1);
        assert_eq!(kind.target_action(), TargetAction::Diagonal);
    }

    #[test]
    fn test_target_actions() {
        assert_eq!(StandardGate::CX.target_action(), TargetAction::Permutation);
        assert_eq!(StandardGate::CP(ParameterExpression::constant(0.5)).target_action(), TargetAction::Diagonal);
        assert_eq!(StandardGate::H.target_action(), TargetAction::General);
        assert_eq!(StandardGate::CSwap.target_action(), TargetAction::Permutation);
    }

    #[test]
    fn test_classical_condition() {
        let cond = ClassicalCondition::new(&[ClbitId(0), ClbitId(1)], 0b10);
        assert!(cond.is_satisfied(|c| c == ClbitId(1)));
        assert!(!cond.is_satisfied(|_| true));

        let both = cond.and(&ClassicalCondition::new(&[ClbitId(2)], 1));
        assert_eq!(both.clbits().count(), 3);
    }

    #[test]
    fn test_gate_creation() {
        let h = Gate::standard(StandardGate::H);
        assert_eq!(h.name(), "h");
        assert_eq!(h.num_qubits(), 1);
        assert!(h.label.is_none());
        assert!(h.condition.is_none());

        let h_labeled = Gate::standard(StandardGate::H).with_label("prep");
        assert_eq!(h_labeled.label, Some("prep".to_string()));
    }
}
