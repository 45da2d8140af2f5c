//! Measuring quantum variables through the simulator.

use qsynth_ir::{Circuit, ParameterBindings};
use qsynth_sim::{SimulationRequest, SimulationResult, Simulator};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decoder::Value;
use crate::error::TypeResult;
use crate::variable::QuantumVariable;

/// How a measurement is taken.
#[derive(Debug, Clone, Default)]
pub struct MeasureOptions {
    /// Sample this many shots; `None` returns exact probabilities.
    pub shots: Option<u32>,
    /// Sampling seed.
    pub seed: Option<u64>,
    /// Values for free circuit parameters.
    pub bindings: ParameterBindings,
}

impl MeasureOptions {
    /// Exact probabilities.
    pub fn exact() -> Self {
        Self::default()
    }

    /// `shots` samples with a fixed seed.
    pub fn sampled(shots: u32, seed: u64) -> Self {
        Self {
            shots: Some(shots),
            seed: Some(seed),
            ..Self::default()
        }
    }
}

/// Decoded outcome distribution of one or more variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Variable names, in value order.
    pub variables: Vec<String>,
    /// Decoded outcomes with their probability or frequency, most likely
    /// first.
    pub outcomes: Vec<(Vec<Value>, f64)>,
}

impl Measurement {
    /// Probability of `values`, zero if never observed.
    pub fn probability(&self, values: &[Value]) -> f64 {
        self.outcomes
            .iter()
            .find(|(v, _)| v.as_slice() == values)
            .map_or(0.0, |(_, p)| *p)
    }

    /// The most likely outcome.
    pub fn most_likely(&self) -> Option<&[Value]> {
        self.outcomes.first().map(|(v, _)| v.as_slice())
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether no outcome was recorded.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Measure `variables` on the final state of `circuit`.
///
/// Exact mode reports Born-rule probabilities; sampled mode reports
/// frequencies, reproducible for a fixed seed.
pub fn get_measurement(
    simulator: &Simulator,
    circuit: &Circuit,
    variables: &[&QuantumVariable],
    options: &MeasureOptions,
) -> TypeResult<Measurement> {
    let mut request = SimulationRequest::new(circuit).with_bindings(options.bindings.clone());
    request.outputs = variables.iter().map(|v| v.output_register()).collect();
    request.shots = options.shots;
    request.seed = options.seed;

    debug!(
        variables = variables.len(),
        shots = ?options.shots,
        "measuring variables"
    );
    let result = simulator.run(&request)?;

    let decode = |raw: &[u64]| -> Vec<Value> {
        variables
            .iter()
            .zip(raw)
            .map(|(v, &r)| v.decode(r))
            .collect()
    };
    let mut outcomes: Vec<(Vec<Value>, f64)> = match &result {
        SimulationResult::Exact { probabilities, .. } => probabilities
            .iter()
            .map(|(raw, &p)| (decode(raw), p))
            .collect(),
        SimulationResult::Sampled { shots, counts, .. } => counts
            .iter()
            .map(|(raw, &n)| (decode(raw), n as f64 / f64::from((*shots).max(1))))
            .collect(),
    };
    // Stable sort keeps raw-pattern order among ties.
    outcomes.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(Measurement {
        variables: variables.iter().map(|v| v.name().to_string()).collect(),
        outcomes,
    })
}

impl QuantumVariable {
    /// Measure this variable alone.
    pub fn get_measurement(
        &self,
        simulator: &Simulator,
        circuit: &Circuit,
        options: &MeasureOptions,
    ) -> TypeResult<Vec<(Value, f64)>> {
        let measurement = get_measurement(simulator, circuit, &[self], options)?;
        Ok(measurement
            .outcomes
            .into_iter()
            .filter_map(|(mut values, p)| values.pop().map(|v| (v, p)))
            .collect())
    }
}
