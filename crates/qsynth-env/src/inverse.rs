//! Gate adjoints.

use qsynth_ir::{Gate, GateKind, Instruction, InstructionKind, StandardGate};

use crate::error::{EnvError, EnvResult};

/// Suffix appended to the label of an adjoint gate.
pub const ADJOINT_SUFFIX: &str = "_dg";

/// Compute the adjoint of a standard gate.
///
/// - H† = H, X† = X and the other Hermitian gates map to themselves
/// - S† = Sdg, T† = Tdg, SX† = SXdg
/// - rotations and phases negate their angle
/// - U(θ, φ, λ)† = U(-θ, -λ, -φ)
pub fn inverse_gate(gate: &StandardGate) -> StandardGate {
    match gate {
        StandardGate::I
        | StandardGate::X
        | StandardGate::Y
        | StandardGate::Z
        | StandardGate::H
        | StandardGate::CX
        | StandardGate::CY
        | StandardGate::CZ
        | StandardGate::CH
        | StandardGate::Swap
        | StandardGate::CCX
        | StandardGate::CSwap => gate.clone(),

        StandardGate::S => StandardGate::Sdg,
        StandardGate::Sdg => StandardGate::S,
        StandardGate::T => StandardGate::Tdg,
        StandardGate::Tdg => StandardGate::T,
        StandardGate::SX => StandardGate::SXdg,
        StandardGate::SXdg => StandardGate::SX,

        StandardGate::Rx(theta) => StandardGate::Rx(-theta.clone()),
        StandardGate::Ry(theta) => StandardGate::Ry(-theta.clone()),
        StandardGate::Rz(theta) => StandardGate::Rz(-theta.clone()),
        StandardGate::P(lambda) => StandardGate::P(-lambda.clone()),
        StandardGate::U(theta, phi, lambda) => {
            StandardGate::U(-theta.clone(), -lambda.clone(), -phi.clone())
        }

        StandardGate::CRx(theta) => StandardGate::CRx(-theta.clone()),
        StandardGate::CRy(theta) => StandardGate::CRy(-theta.clone()),
        StandardGate::CRz(theta) => StandardGate::CRz(-theta.clone()),
        StandardGate::CP(lambda) => StandardGate::CP(-lambda.clone()),
    }
}

/// Adjoint of a gate kind. Controls are unchanged.
pub fn inverse_kind(kind: &GateKind) -> GateKind {
    match kind {
        GateKind::Standard(g) => GateKind::Standard(inverse_gate(g)),
        GateKind::Controlled(_) => {
            let (root, controls) = kind.split_controls();
            GateKind::with_controls(&GateKind::Standard(inverse_gate(&root)), controls)
        }
    }
}

/// Toggle the adjoint suffix on a label.
pub fn adjoint_label(label: &str) -> String {
    match label.strip_suffix(ADJOINT_SUFFIX) {
        Some(base) => base.to_string(),
        None => format!("{label}{ADJOINT_SUFFIX}"),
    }
}

/// Compute the adjoint of an instruction.
///
/// Barriers map to themselves; measurement has no adjoint.
pub fn inverse_instruction(instruction: &Instruction) -> EnvResult<Instruction> {
    match &instruction.kind {
        InstructionKind::Gate(gate) => Ok(Instruction {
            kind: InstructionKind::Gate(Gate {
                kind: inverse_kind(&gate.kind),
                label: gate.label.as_deref().map(adjoint_label),
                condition: gate.condition.clone(),
            }),
            qubits: instruction.qubits.clone(),
            clbits: instruction.clbits.clone(),
        }),
        InstructionKind::Measure => Err(EnvError::NonInvertible("measure".into())),
        InstructionKind::Barrier => Ok(instruction.clone()),
    }
}

/// Check if a gate is its own adjoint.
pub fn is_self_inverse(gate: &StandardGate) -> bool {
    inverse_gate(gate) == *gate && gate.parameters().is_empty()
}
