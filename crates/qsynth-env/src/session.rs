//! The compilation session.
//!
//! A [`Session`] owns the qubit allocator, the circuit under construction and
//! the stack of open environments. Every operation travels from the innermost
//! environment outwards before it reaches the circuit:
//!
//! - a conjugation in its compute phase logs the operation for later
//!   inversion; from there on the operation is *balanced*
//! - controlled and classical-control environments only modify unbalanced
//!   operations, since `U · C(V) · U†` equals `C(U V U†)`
//! - an inversion environment buffers the operation and stops it
//!
//! Leak checking works per environment: an owned qubit that is the
//! non-diagonal target of an operation unbalanced at that level, or that is
//! measured, may hold a value at exit and is reported as leaked.

use qsynth_ir::{
    Circuit, ClbitId, Gate, GateKind, Instruction, InstructionKind, ParameterExpression, Qubit,
    QubitAllocator, QubitId, ResourceError, StandardGate, TargetAction,
};
use tracing::{debug, trace};

use crate::config::SessionConfig;
use crate::error::{EnvError, EnvResult};
use crate::frame::{Frame, FrameId, FrameKind, Phase};
use crate::inverse::inverse_instruction;

/// Root frame: owns top-level allocations and is never exited.
const ROOT: FrameId = FrameId(0);

/// An explicit compilation session.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    allocator: QubitAllocator,
    circuit: Circuit,
    frames: Vec<Frame>,
    next_frame: u32,
    poisoned: bool,
}

impl Session {
    /// Create a session.
    pub fn new(config: SessionConfig) -> Self {
        let allocator = QubitAllocator::new(config.max_qubits);
        let circuit = Circuit::new(config.name.clone());
        Self {
            config,
            allocator,
            circuit,
            frames: vec![Frame::new(ROOT, FrameKind::Scope, "root".into())],
            next_frame: 1,
            poisoned: false,
        }
    }

    /// Create a session with default settings and the given circuit name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(SessionConfig::named(name))
    }

    fn ensure_usable(&self) -> EnvResult<()> {
        if self.poisoned {
            Err(EnvError::SessionPoisoned)
        } else {
            Ok(())
        }
    }

    fn innermost(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    // =========================================================================
    // Qubits
    // =========================================================================

    /// Allocate `count` fresh qubits owned by the innermost environment.
    pub fn allocate(&mut self, count: u32, name: &str) -> EnvResult<Vec<QubitId>> {
        self.ensure_usable()?;
        if self
            .frames
            .iter()
            .any(|f| f.kind == FrameKind::Inversion)
        {
            return Err(ResourceError::AllocationInInversion.into());
        }

        let ids = self.allocator.allocate(count)?;
        for (i, &id) in ids.iter().enumerate() {
            self.circuit
                .register_qubit(Qubit::with_register(id, name, i as u32));
        }

        let frame = self.innermost();
        frame.owned.extend(ids.iter().copied());
        if frame.kind == FrameKind::Conjugation && frame.phase == Phase::Compute {
            frame.compute_ancillae.extend(ids.iter().copied());
        }
        Ok(ids)
    }

    /// Return qubits to the allocator.
    ///
    /// Fails if an open environment still needs any of them: as a control, or
    /// in a compute log or inversion buffer that has not been replayed yet.
    /// Fails with [`EnvError::Uncomputation`] if any of them may still hold a
    /// value; a caller that restored them by hand says so with
    /// [`Session::assert_restored`] first.
    pub fn release(&mut self, qubits: &[QubitId]) -> EnvResult<()> {
        self.ensure_usable()?;
        for &q in qubits {
            if let Some(frame) = self.frames.iter().find(|f| f.references(q)) {
                return Err(ResourceError::PendingEnvironment {
                    qubit: q,
                    frame: frame.kind.name().to_string(),
                }
                .into());
            }
        }
        let dirty: Vec<QubitId> = qubits
            .iter()
            .copied()
            .filter(|&q| !self.is_clean(q))
            .collect();
        if !dirty.is_empty() {
            let fragment = self.frames[self.frames.len() - 1].label.clone();
            debug!(fragment = %fragment, qubits = ?dirty, "release of dirty qubits refused");
            return Err(EnvError::Uncomputation {
                fragment,
                qubits: dirty,
            });
        }
        self.reclaim(qubits)?;
        Ok(())
    }

    fn reclaim(&mut self, qubits: &[QubitId]) -> EnvResult<()> {
        if qubits.is_empty() {
            return Ok(());
        }
        self.allocator.deallocate(qubits)?;
        self.circuit.record_release(qubits);
        // A reclaimed id comes back fresh: no frame may keep state about it.
        for frame in &mut self.frames {
            frame.owned.retain(|q| !qubits.contains(q));
            frame.exported.retain(|q| !qubits.contains(q));
            for q in qubits {
                frame.touched.remove(q);
                frame.superposed.remove(q);
                frame.compute_ancillae.remove(q);
            }
        }
        Ok(())
    }

    /// Hand qubits owned by the innermost environment to its parent.
    pub fn export(&mut self, qubits: &[QubitId]) -> EnvResult<()> {
        self.ensure_usable()?;
        if self.frames.len() <= 1 {
            return Err(EnvError::NoOpenFrame);
        }
        let frame = self.innermost();
        if matches!(frame.kind, FrameKind::ClassicalControl(_)) {
            return Err(EnvError::CarryValue(qubits.to_vec()));
        }
        for &q in qubits {
            if !frame.owns(q) {
                return Err(ResourceError::NotOwned(q).into());
            }
            if frame.compute_ancillae.contains(&q) {
                return Err(EnvError::InvalidExport {
                    qubit: q,
                    reason: "allocated in a compute phase",
                });
            }
        }
        frame.exported.extend(qubits.iter().copied());
        Ok(())
    }

    /// Declare that `qubits` are back in |0> by an identity the session cannot
    /// see, clearing them from every environment's leak check.
    pub fn assert_restored(&mut self, qubits: &[QubitId]) -> EnvResult<()> {
        self.ensure_usable()?;
        for frame in &mut self.frames {
            for q in qubits {
                frame.touched.remove(q);
            }
        }
        Ok(())
    }

    /// Whether no open environment has seen `qubit` change.
    pub fn is_clean(&self, qubit: QubitId) -> bool {
        !self.frames.iter().any(|f| f.touched.contains(&qubit))
    }

    // =========================================================================
    // Emission
    // =========================================================================

    /// Apply a gate.
    pub fn apply(&mut self, gate: impl Into<Gate>, qubits: &[QubitId]) -> EnvResult<()> {
        self.emit(Instruction::gate(gate, qubits.iter().copied()))
    }

    /// Measure a qubit into a fresh classical bit.
    pub fn measure(&mut self, qubit: QubitId) -> EnvResult<ClbitId> {
        self.ensure_usable()?;
        if let Some(frame) = self.frames.iter().rev().find(|f| {
            matches!(
                f.kind,
                FrameKind::Controlled(_) | FrameKind::ClassicalControl(_)
            )
        }) {
            return Err(EnvError::Uncontrollable {
                operation: "measure".into(),
                frame: frame.kind.name(),
            });
        }
        if let Some(frame) = self.frames.iter().rev().find(|f| {
            f.kind == FrameKind::Inversion
                || (f.kind == FrameKind::Conjugation && f.phase == Phase::Compute)
        }) {
            return Err(EnvError::NonInvertible(format!(
                "measure inside {} '{}'",
                frame.kind.name(),
                frame.label
            )));
        }
        if !self.allocator.is_live(qubit) {
            return Err(ResourceError::NotAllocated(qubit).into());
        }
        let clbit = self.circuit.add_clbit(Some(qubit));
        self.emit(Instruction::measure(qubit, clbit))?;
        Ok(clbit)
    }

    /// Insert a barrier.
    pub fn barrier(&mut self, qubits: &[QubitId]) -> EnvResult<()> {
        self.emit(Instruction::barrier(qubits.iter().copied()))
    }

    fn emit(&mut self, inst: Instruction) -> EnvResult<()> {
        self.ensure_usable()?;
        if let Some(&q) = inst.qubits.iter().find(|&&q| !self.allocator.is_live(q)) {
            return Err(ResourceError::NotAllocated(q).into());
        }
        let level = self.frames.len();
        self.emit_from(level, inst, false)
    }

    /// Route `inst` through `frames[..level]`, innermost first.
    fn emit_from(&mut self, level: usize, mut inst: Instruction, mut balanced: bool) -> EnvResult<()> {
        for i in (0..level).rev() {
            let frame = &mut self.frames[i];
            match &frame.kind {
                FrameKind::Conjugation if frame.phase == Phase::Compute => {
                    if inst.is_measure() {
                        return Err(EnvError::NonInvertible("measure".into()));
                    }
                    for q in targets(&inst, TargetAction::General) {
                        if frame.owns(q) {
                            frame.superposed.insert(q);
                        }
                    }
                    frame.log.push((inst.clone(), balanced));
                    balanced = true;
                }
                FrameKind::Conjugation => {
                    if !balanced {
                        let hit: Vec<_> = inst
                            .qubits
                            .iter()
                            .copied()
                            .filter(|q| frame.superposed.contains(q))
                            .collect();
                        frame.touched.extend(hit);
                    }
                }
                FrameKind::Controlled(controls) => {
                    if !balanced {
                        inst = add_controls(inst, controls)?;
                    }
                }
                FrameKind::ClassicalControl(condition) => {
                    if !balanced {
                        inst = add_condition(inst, condition)?;
                    }
                }
                FrameKind::Inversion => {
                    if inst.is_measure() {
                        return Err(EnvError::NonInvertible("measure".into()));
                    }
                    trace!(frame = %frame.id, op = inst.name(), "buffered for inversion");
                    frame.log.push((inst, balanced));
                    return Ok(());
                }
                FrameKind::Iteration | FrameKind::Scope => {}
            }

            if inst.is_measure() {
                frame.touched.extend(inst.qubits.iter().copied());
            } else if !balanced {
                frame.touched.extend(targets(&inst, TargetAction::Permutation));
            }
        }

        for &q in &inst.qubits {
            self.allocator.mark_entangled(q);
        }
        for frame in &mut self.frames[..level] {
            frame.emitted += 1;
        }
        trace!(op = inst.name(), qubits = ?inst.qubits, balanced, "emit");
        self.circuit.push(inst)?;
        Ok(())
    }

    // =========================================================================
    // Environments
    // =========================================================================

    /// Open an environment.
    pub fn enter(&mut self, kind: FrameKind, label: impl Into<String>) -> EnvResult<FrameId> {
        self.ensure_usable()?;
        if let FrameKind::Controlled(controls) = &kind {
            if let Some(&q) = controls.iter().find(|&&q| !self.allocator.is_live(q)) {
                return Err(ResourceError::NotAllocated(q).into());
            }
        }
        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        let label = label.into();
        debug!(
            frame = %id,
            kind = kind.name(),
            label = %label,
            depth = self.frames.len(),
            "enter environment"
        );
        self.frames.push(Frame::new(id, kind, label));
        Ok(id)
    }

    /// Switch the innermost conjugation from compute to action.
    pub fn begin_action(&mut self) -> EnvResult<()> {
        self.ensure_usable()?;
        let frame = self.innermost();
        if frame.kind != FrameKind::Conjugation || frame.phase != Phase::Compute {
            return Err(EnvError::NotInCompute);
        }
        frame.phase = Phase::Action;
        trace!(frame = %frame.id, logged = frame.log.len(), "begin action");
        Ok(())
    }

    /// Close the innermost environment.
    ///
    /// Exiting anything but the innermost environment is a scope violation
    /// and poisons the session.
    pub fn exit(&mut self, id: FrameId) -> EnvResult<()> {
        self.ensure_usable()?;
        if self.frames.len() <= 1 {
            return Err(EnvError::NoOpenFrame);
        }
        let top = self.frames[self.frames.len() - 1].id;
        if top != id {
            self.poisoned = true;
            return Err(EnvError::ScopeViolation {
                expected: top,
                got: id,
            });
        }
        let Some(frame) = self.frames.pop() else {
            return Err(EnvError::NoOpenFrame);
        };

        if let Err(err) = self.replay(&frame) {
            self.force_reclaim(&frame);
            return Err(err);
        }

        let leaked = frame.leaked();
        if !leaked.is_empty() {
            self.force_reclaim(&frame);
            return Err(EnvError::Uncomputation {
                fragment: frame.label,
                qubits: leaked,
            });
        }

        self.reclaim(&frame.to_reclaim())?;
        let parent = self.innermost();
        for &q in &frame.exported {
            parent.owned.push(q);
            if parent.kind == FrameKind::Conjugation && parent.phase == Phase::Compute {
                parent.compute_ancillae.insert(q);
            }
        }

        debug!(
            frame = %frame.id,
            kind = frame.kind.name(),
            label = %frame.label,
            depth = self.frames.len(),
            ops = frame.emitted,
            exported = frame.exported.len(),
            "exit environment"
        );
        Ok(())
    }

    /// Emit what a closing frame owes its parent: the adjoint of a
    /// conjugation's compute log, or of an inversion's buffered body.
    fn replay(&mut self, frame: &Frame) -> EnvResult<()> {
        let level = self.frames.len();
        match frame.kind {
            FrameKind::Conjugation => {
                for (inst, _) in frame.log.iter().rev() {
                    self.emit_from(level, inverse_instruction(inst)?, true)?;
                }
            }
            FrameKind::Inversion => {
                for (inst, balanced) in frame.log.iter().rev() {
                    self.emit_from(level, inverse_instruction(inst)?, *balanced)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn force_reclaim(&mut self, frame: &Frame) {
        let live: Vec<_> = frame
            .owned
            .iter()
            .copied()
            .filter(|&q| self.allocator.is_live(q))
            .collect();
        if let Err(err) = self.reclaim(&live) {
            debug!(frame = %frame.id, error = %err, "reclaim after failure");
        }
    }

    /// Discard `id` and every environment opened inside it without emitting
    /// anything further. Their qubits are reclaimed unconditionally.
    pub fn abort(&mut self, id: FrameId) {
        let Some(pos) = self.frames.iter().position(|f| f.id == id) else {
            return;
        };
        if pos == 0 {
            return;
        }
        let dropped: Vec<Frame> = self.frames.drain(pos..).collect();
        for frame in dropped.iter().rev() {
            debug!(frame = %frame.id, kind = frame.kind.name(), label = %frame.label, "abort environment");
            self.force_reclaim(frame);
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The circuit built so far.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// The allocator.
    pub fn allocator(&self) -> &QubitAllocator {
        &self.allocator
    }

    /// Number of open user environments.
    pub fn open_environments(&self) -> usize {
        self.frames.len() - 1
    }

    /// Whether a scope violation has poisoned the session.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Seal and return the circuit.
    pub fn finish(mut self) -> EnvResult<Circuit> {
        self.ensure_usable()?;
        if self.frames.len() > 1 {
            return Err(EnvError::UnclosedEnvironment(self.frames.len() - 1));
        }
        self.circuit.finish();
        debug!(
            name = self.circuit.name(),
            ops = self.circuit.num_ops(),
            peak = self.allocator.peak(),
            "session finished"
        );
        Ok(self.circuit)
    }

    // =========================================================================
    // Gate helpers
    // =========================================================================

    /// Apply Pauli-X.
    pub fn x(&mut self, q: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::X, &[q])
    }

    /// Apply Pauli-Y.
    pub fn y(&mut self, q: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::Y, &[q])
    }

    /// Apply Pauli-Z.
    pub fn z(&mut self, q: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::Z, &[q])
    }

    /// Apply Hadamard.
    pub fn h(&mut self, q: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::H, &[q])
    }

    /// Apply S.
    pub fn s(&mut self, q: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::S, &[q])
    }

    /// Apply T.
    pub fn t(&mut self, q: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::T, &[q])
    }

    /// Apply Rx.
    pub fn rx(&mut self, theta: impl Into<ParameterExpression>, q: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::Rx(theta.into()), &[q])
    }

    /// Apply Ry.
    pub fn ry(&mut self, theta: impl Into<ParameterExpression>, q: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::Ry(theta.into()), &[q])
    }

    /// Apply Rz.
    pub fn rz(&mut self, theta: impl Into<ParameterExpression>, q: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::Rz(theta.into()), &[q])
    }

    /// Apply a phase gate.
    pub fn p(&mut self, theta: impl Into<ParameterExpression>, q: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::P(theta.into()), &[q])
    }

    /// Apply CNOT.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::CX, &[control, target])
    }

    /// Apply CZ.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::CZ, &[control, target])
    }

    /// Apply a controlled phase.
    pub fn cp(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> EnvResult<()> {
        self.apply(StandardGate::CP(theta.into()), &[control, target])
    }

    /// Apply Toffoli.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::CCX, &[c1, c2, target])
    }

    /// Apply X on `target` controlled on every qubit in `controls`.
    pub fn mcx(&mut self, controls: &[QubitId], target: QubitId) -> EnvResult<()> {
        let mut qubits = controls.to_vec();
        qubits.push(target);
        self.apply(Gate::controlled(StandardGate::X, controls.len() as u32), &qubits)
    }

    /// Apply SWAP.
    pub fn swap(&mut self, a: QubitId, b: QubitId) -> EnvResult<()> {
        self.apply(StandardGate::Swap, &[a, b])
    }
}

/// Non-control operands whose target action is at least `min`.
///
/// `Permutation` selects every non-diagonal target; `General` only targets of
/// gates that can create superposition.
fn targets(inst: &Instruction, min: TargetAction) -> Vec<QubitId> {
    let Some(gate) = inst.as_gate() else {
        return vec![];
    };
    let action = gate.kind.target_action();
    let selected = match min {
        TargetAction::Diagonal => true,
        TargetAction::Permutation => action != TargetAction::Diagonal,
        TargetAction::General => action == TargetAction::General,
    };
    if !selected {
        return vec![];
    }
    let controls = gate.kind.num_controls() as usize;
    inst.qubits.iter().skip(controls).copied().collect()
}

fn add_controls(inst: Instruction, controls: &[QubitId]) -> EnvResult<Instruction> {
    match inst.kind {
        InstructionKind::Gate(gate) => {
            let kind = GateKind::with_controls(&gate.kind, controls.len() as u32);
            let mut qubits = controls.to_vec();
            qubits.extend(inst.qubits);
            Ok(Instruction {
                kind: InstructionKind::Gate(Gate { kind, ..gate }),
                qubits,
                clbits: inst.clbits,
            })
        }
        InstructionKind::Measure => Err(EnvError::Uncontrollable {
            operation: "measure".into(),
            frame: "controlled",
        }),
        InstructionKind::Barrier => Ok(Instruction {
            kind: InstructionKind::Barrier,
            qubits: inst.qubits,
            clbits: inst.clbits,
        }),
    }
}

fn add_condition(
    inst: Instruction,
    condition: &qsynth_ir::ClassicalCondition,
) -> EnvResult<Instruction> {
    match inst.kind {
        InstructionKind::Gate(gate) => Ok(Instruction {
            kind: InstructionKind::Gate(gate.with_condition(condition.clone())),
            qubits: inst.qubits,
            clbits: inst.clbits,
        }),
        InstructionKind::Measure => Err(EnvError::Uncontrollable {
            operation: "measure".into(),
            frame: "classical-control",
        }),
        InstructionKind::Barrier => Ok(Instruction {
            kind: InstructionKind::Barrier,
            qubits: inst.qubits,
            clbits: inst.clbits,
        }),
    }
}
