//! Gate and qubit counts without simulation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::circuit::{AllocationEvent, Circuit};

/// Resource summary of a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceCounts {
    /// Operation count per instruction name.
    pub by_name: BTreeMap<String, usize>,
    /// Total number of operations, barriers excluded.
    pub total: usize,
    /// Operations acting on two or more qubits.
    pub multi_qubit: usize,
    /// Measurements.
    pub measurements: usize,
    /// Circuit depth.
    pub depth: usize,
    /// Peak number of simultaneously live qubits.
    pub width: usize,
}

impl ResourceCounts {
    /// Walk a circuit and count its resources.
    pub fn from_circuit(circuit: &Circuit) -> Self {
        let mut counts = ResourceCounts {
            depth: circuit.depth(),
            width: peak_live(circuit),
            ..Self::default()
        };
        for inst in circuit.instructions() {
            if inst.is_barrier() {
                continue;
            }
            *counts.by_name.entry(inst.name().to_string()).or_default() += 1;
            counts.total += 1;
            if inst.is_measure() {
                counts.measurements += 1;
            } else if inst.qubits.len() >= 2 {
                counts.multi_qubit += 1;
            }
        }
        counts
    }

    /// Count of operations named `name`.
    pub fn count(&self, name: &str) -> usize {
        self.by_name.get(name).copied().unwrap_or(0)
    }
}

/// Number of operations in `circuit` whose gate carries `label`.
pub fn count_labelled(circuit: &Circuit, label: &str) -> usize {
    circuit
        .instructions()
        .iter()
        .filter(|inst| inst.label() == Some(label))
        .count()
}

fn peak_live(circuit: &Circuit) -> usize {
    if circuit.timeline().is_empty() {
        return circuit.num_qubits();
    }
    let mut live = 0usize;
    let mut peak = 0usize;
    for event in circuit.timeline() {
        match event {
            AllocationEvent::Allocate { .. } => {
                live += 1;
                peak = peak.max(live);
            }
            AllocationEvent::Release { .. } => live = live.saturating_sub(1),
        }
    }
    peak
}

impl fmt::Display for ResourceCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "qubits: {}", self.width)?;
        writeln!(f, "depth: {}", self.depth)?;
        writeln!(
            f,
            "operations: {} ({} multi-qubit, {} measurements)",
            self.total, self.multi_qubit, self.measurements
        )?;
        for (name, n) in &self.by_name {
            writeln!(f, "  {name:<8} {n}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{Gate, StandardGate};
    use crate::qubit::{Qubit, QubitId};

    #[test]
    fn test_counts_bell() {
        let counts = ResourceCounts::from_circuit(&Circuit::bell().unwrap());
        assert_eq!(counts.total, 4);
        assert_eq!(counts.count("h"), 1);
        assert_eq!(counts.count("cx"), 1);
        assert_eq!(counts.measurements, 2);
        assert_eq!(counts.multi_qubit, 1);
        assert_eq!(counts.width, 2);
    }

    #[test]
    fn test_width_uses_allocation_peak() {
        let mut circuit = Circuit::new("t");
        circuit.register_qubit(Qubit::new(QubitId(0)));
        circuit.register_qubit(Qubit::new(QubitId(1)));
        circuit.record_release(&[QubitId(1)]);
        circuit.register_qubit(Qubit::new(QubitId(1)));
        circuit.register_qubit(Qubit::new(QubitId(2)));
        assert_eq!(ResourceCounts::from_circuit(&circuit).width, 3);
    }

    #[test]
    fn test_count_labelled() {
        let mut circuit = Circuit::with_size("t", 2, 0);
        let g = Gate::standard(StandardGate::X).with_label("flag");
        circuit.gate(g.clone(), [QubitId(0)]).unwrap();
        circuit.gate(g, [QubitId(1)]).unwrap();
        circuit.h(QubitId(0)).unwrap();
        assert_eq!(count_labelled(&circuit, "flag"), 2);
    }

    #[test]
    fn test_counts_json() {
        let counts = ResourceCounts::from_circuit(&Circuit::bell().unwrap());
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["width"], 2);
        assert_eq!(json["by_name"]["cx"], 1);
        let back: ResourceCounts = serde_json::from_value(json).unwrap();
        assert_eq!(back, counts);
    }
}
