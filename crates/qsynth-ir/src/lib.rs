//! qsynth circuit intermediate representation.
//!
//! This crate holds the data every other qsynth crate builds on: qubit
//! handles and the allocator that issues them, the closed set of gates,
//! instructions, and the append-only [`Circuit`] graph with its dependency
//! DAG.
//!
//! # Core Components
//!
//! - **Qubits**: [`QubitId`] handles issued by a [`QubitAllocator`], which
//!   reuses reclaimed ids lowest-index-first
//! - **Gates**: [`StandardGate`] plus [`GateKind::Controlled`] for any number
//!   of extra controls
//! - **Parameters**: [`ParameterExpression`] for symbolic angles
//! - **Circuit**: [`Circuit`], the operation log with its allocation timeline
//! - **Resources**: [`ResourceCounts`] for gate counts, depth and width
//!
//! # Example
//!
//! ```rust
//! use qsynth_ir::{Circuit, QubitAllocator, Qubit};
//!
//! let mut alloc = QubitAllocator::new(None);
//! let mut circuit = Circuit::new("bell");
//! let q = alloc.allocate(2).unwrap();
//! for &id in &q {
//!     circuit.register_qubit(Qubit::new(id));
//! }
//! circuit.h(q[0]).unwrap().cx(q[0], q[1]).unwrap();
//!
//! assert_eq!(circuit.num_ops(), 2);
//! assert_eq!(circuit.depth(), 2);
//! ```

pub mod allocator;
pub mod circuit;
pub mod dag;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;
pub mod resources;

pub use allocator::{QubitAllocator, QubitState};
pub use circuit::{AllocationEvent, Circuit};
pub use dag::{CircuitDag, DagEdge, DagNode, NodeIndex, WireId};
pub use error::{IrError, IrResult, ResourceError, ResourceResult};
pub use gate::{ClassicalCondition, ControlledGate, Gate, GateKind, StandardGate, TargetAction};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::{ParameterBindings, ParameterExpression};
pub use qubit::{Clbit, ClbitId, Qubit, QubitId};
pub use resources::{ResourceCounts, count_labelled};
