//! Simulator entry points.

use num_complex::Complex64;
use qsynth_ir::{
    Circuit, ClassicalCondition, ClbitId, InstructionKind, IrResult, ParameterBindings, QubitId,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::SimulatorConfig;
use crate::error::{SimError, SimResult};
use crate::kernel::{self, Kernel};
use crate::progress::{CancellationToken, ProgressGuard};
use crate::statevector::Statevector;
use crate::symbolic::SymbolicStatevector;

/// One value per output register, in request order.
pub type Outcome = Vec<u64>;

/// A named group of qubits read out as one integer, `qubits[0]` least
/// significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRegister {
    /// Register name.
    pub name: String,
    /// Qubits, least significant first.
    pub qubits: Vec<QubitId>,
}

/// Input to [`Simulator::run`].
#[derive(Debug, Clone)]
pub struct SimulationRequest<'a> {
    /// The circuit.
    pub circuit: &'a Circuit,
    /// Values for free parameters.
    pub bindings: ParameterBindings,
    /// Registers to read out. Empty reads every qubit as one register.
    pub outputs: Vec<OutputRegister>,
    /// Shots to sample; `None` asks for exact probabilities.
    pub shots: Option<u32>,
    /// Overrides the configured seed.
    pub seed: Option<u64>,
    /// Checked between gates.
    pub cancellation: Option<CancellationToken>,
}

impl<'a> SimulationRequest<'a> {
    /// An exact request with no bindings.
    pub fn new(circuit: &'a Circuit) -> Self {
        Self {
            circuit,
            bindings: ParameterBindings::new(),
            outputs: vec![],
            shots: None,
            seed: None,
            cancellation: None,
        }
    }

    /// Bind one parameter.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: f64) -> Self {
        self.bindings.insert(name.into(), value);
        self
    }

    /// Replace all bindings.
    #[must_use]
    pub fn with_bindings(mut self, bindings: ParameterBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Add an output register.
    #[must_use]
    pub fn with_register(mut self, name: impl Into<String>, qubits: &[QubitId]) -> Self {
        self.outputs.push(OutputRegister {
            name: name.into(),
            qubits: qubits.to_vec(),
        });
        self
    }

    /// Sample `shots` outcomes.
    #[must_use]
    pub fn with_shots(mut self, shots: u32) -> Self {
        self.shots = Some(shots);
        self
    }

    /// Fix the sampling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Output of [`Simulator::run`].
#[derive(Debug, Clone)]
pub enum SimulationResult {
    /// Exact outcome distribution.
    Exact {
        /// Register names, in outcome order.
        registers: Vec<String>,
        /// Probability of every outcome with non-negligible weight.
        probabilities: BTreeMap<Outcome, f64>,
        /// Final amplitudes.
        amplitudes: Vec<Complex64>,
        /// `|norm^2 - 1|` of the final state.
        norm_drift: f64,
    },
    /// Sampled outcome counts.
    Sampled {
        /// Register names, in outcome order.
        registers: Vec<String>,
        /// Number of shots.
        shots: u32,
        /// Occurrences of each outcome.
        counts: BTreeMap<Outcome, u64>,
        /// Largest `|norm^2 - 1|` over the simulated states.
        norm_drift: f64,
    },
}

impl SimulationResult {
    /// Norm drift of the simulated state.
    pub fn norm_drift(&self) -> f64 {
        match self {
            SimulationResult::Exact { norm_drift, .. }
            | SimulationResult::Sampled { norm_drift, .. } => *norm_drift,
        }
    }

    /// Register names.
    pub fn registers(&self) -> &[String] {
        match self {
            SimulationResult::Exact { registers, .. }
            | SimulationResult::Sampled { registers, .. } => registers,
        }
    }

    /// Probability of `outcome`, or its observed frequency when sampled.
    pub fn probability(&self, outcome: &[u64]) -> f64 {
        match self {
            SimulationResult::Exact { probabilities, .. } => {
                probabilities.get(outcome).copied().unwrap_or(0.0)
            }
            SimulationResult::Sampled { shots, counts, .. } => {
                if *shots == 0 {
                    return 0.0;
                }
                counts.get(outcome).copied().unwrap_or(0) as f64 / f64::from(*shots)
            }
        }
    }

    /// The most probable (or most frequent) outcome.
    pub fn most_likely(&self) -> Option<&Outcome> {
        match self {
            SimulationResult::Exact { probabilities, .. } => probabilities
                .iter()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(o, _)| o),
            SimulationResult::Sampled { counts, .. } => {
                counts.iter().max_by_key(|(_, n)| **n).map(|(o, _)| o)
            }
        }
    }

    /// Sampled counts.
    pub fn counts(&self) -> Option<&BTreeMap<Outcome, u64>> {
        match self {
            SimulationResult::Sampled { counts, .. } => Some(counts),
            SimulationResult::Exact { .. } => None,
        }
    }

    /// Final amplitudes of an exact run.
    pub fn amplitudes(&self) -> Option<&[Complex64]> {
        match self {
            SimulationResult::Exact { amplitudes, .. } => Some(amplitudes),
            SimulationResult::Sampled { .. } => None,
        }
    }
}

/// A circuit lowered for execution.
enum Step {
    Gate {
        kernels: Vec<Kernel>,
        condition: Option<ClassicalCondition>,
    },
    Measure {
        qubit: usize,
        clbit: usize,
    },
}

/// Probabilities below this are left out of exact results.
const NEGLIGIBLE: f64 = 1e-15;

/// State-vector simulator.
///
/// ```
/// use qsynth_ir::Circuit;
/// use qsynth_sim::{SimulationRequest, Simulator, SimulatorConfig};
///
/// let sim = Simulator::new(SimulatorConfig::default())?;
/// let circuit = Circuit::ghz(3)?;
/// let result = sim.run(&SimulationRequest::new(&circuit))?;
/// assert!((result.probability(&[0b111]) - 0.5).abs() < 1e-12);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Simulator {
    config: SimulatorConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Simulator {
    /// Create a simulator. A dedicated pool is built if `num_threads` is set.
    pub fn new(config: SimulatorConfig) -> SimResult<Self> {
        config.validate()?;
        let pool = match config.num_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| SimError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };
        Ok(Self { config, pool })
    }

    /// The configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Simulate a circuit.
    #[instrument(skip(self, request), fields(qubits = request.circuit.width(), shots = ?request.shots))]
    pub fn run(&self, request: &SimulationRequest<'_>) -> SimResult<SimulationResult> {
        match &self.pool {
            Some(pool) => pool.install(|| self.execute(request)),
            None => self.execute(request),
        }
    }

    /// Final state of a circuit without measurement.
    pub fn statevector(
        &self,
        circuit: &Circuit,
        bindings: &ParameterBindings,
    ) -> SimResult<Statevector> {
        let request = SimulationRequest::new(circuit).with_bindings(bindings.clone());
        match self.run(&request)? {
            SimulationResult::Exact { amplitudes, .. } => {
                Ok(Statevector::from_raw(amplitudes, circuit.width()))
            }
            SimulationResult::Sampled { .. } => Err(SimError::DynamicCircuit),
        }
    }

    /// Build the state with amplitudes left symbolic in unbound parameters.
    #[instrument(skip(self, circuit, bindings), fields(qubits = circuit.width()))]
    pub fn symbolic_state(
        &self,
        circuit: &Circuit,
        bindings: &ParameterBindings,
    ) -> SimResult<SymbolicStatevector> {
        let width = self.check_width(circuit)?;
        if circuit.is_dynamic() {
            return Err(SimError::DynamicCircuit);
        }
        SymbolicStatevector::build(circuit, width, bindings)
    }

    fn check_width(&self, circuit: &Circuit) -> SimResult<usize> {
        let width = circuit.width();
        if width > self.config.max_qubits as usize {
            return Err(SimError::TooManyQubits {
                requested: width,
                max: self.config.max_qubits,
            });
        }
        Ok(width)
    }

    fn execute(&self, request: &SimulationRequest<'_>) -> SimResult<SimulationResult> {
        let start = Instant::now();
        let circuit = request.circuit;
        let width = self.check_width(circuit)?;

        if let Some(name) = circuit
            .symbols()
            .into_iter()
            .find(|s| !request.bindings.contains_key(s))
        {
            return Err(SimError::ParameterBinding { name });
        }

        let registers = resolve_registers(&request.outputs, width)?;
        let dynamic = circuit.is_dynamic();
        let steps = lower_circuit(circuit, &request.bindings, dynamic)?;
        let parallel = width >= self.config.parallel_threshold as usize;
        let cancel = request.cancellation.as_ref();

        let seed = request.seed.or(self.config.seed);
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        debug!(
            qubits = width,
            ops = steps.len(),
            shots = ?request.shots,
            dynamic,
            parallel,
            "simulation start"
        );

        let names: Vec<String> = registers.iter().map(|(n, _)| n.clone()).collect();
        let result = match (request.shots, dynamic) {
            (None, true) => return Err(SimError::DynamicCircuit),
            (None, false) => {
                let guard = ProgressGuard::new(self.config.progress, steps.len() as u64);
                let state = self.trajectory(
                    &steps,
                    width,
                    circuit.num_clbits(),
                    parallel,
                    &guard,
                    cancel,
                    &mut rng,
                )?;
                let norm_drift = (state.norm_sqr() - 1.0).abs();
                let mut probabilities = BTreeMap::new();
                for (i, amp) in state.amplitudes().iter().enumerate() {
                    let p = amp.norm_sqr();
                    if p > NEGLIGIBLE {
                        *probabilities.entry(read_out(i, &registers)).or_insert(0.0) += p;
                    }
                }
                SimulationResult::Exact {
                    registers: names,
                    probabilities,
                    amplitudes: state.into_amplitudes(),
                    norm_drift,
                }
            }
            (Some(shots), false) => {
                let guard = ProgressGuard::new(self.config.progress, steps.len() as u64);
                let state = self.trajectory(
                    &steps,
                    width,
                    circuit.num_clbits(),
                    parallel,
                    &guard,
                    cancel,
                    &mut rng,
                )?;
                let norm_drift = (state.norm_sqr() - 1.0).abs();
                let cdf: Vec<f64> = state
                    .amplitudes()
                    .iter()
                    .scan(0.0, |acc, a| {
                        *acc += a.norm_sqr();
                        Some(*acc)
                    })
                    .collect();
                let total = cdf.last().copied().unwrap_or(0.0);
                let mut counts = BTreeMap::new();
                for _ in 0..shots {
                    let r = rng.r#gen::<f64>() * total;
                    let index = cdf.partition_point(|&c| c <= r).min(cdf.len() - 1);
                    *counts.entry(read_out(index, &registers)).or_insert(0) += 1;
                }
                SimulationResult::Sampled {
                    registers: names,
                    shots,
                    counts,
                    norm_drift,
                }
            }
            (Some(shots), true) => {
                let guard = ProgressGuard::new(
                    self.config.progress,
                    steps.len() as u64 * u64::from(shots),
                );
                let mut counts = BTreeMap::new();
                let mut norm_drift: f64 = 0.0;
                for _ in 0..shots {
                    let state = self.trajectory(
                    &steps,
                    width,
                    circuit.num_clbits(),
                    parallel,
                    &guard,
                    cancel,
                    &mut rng,
                )?;
                    norm_drift = norm_drift.max((state.norm_sqr() - 1.0).abs());
                    let index = state.sample(&mut rng);
                    *counts.entry(read_out(index, &registers)).or_insert(0) += 1;
                }
                SimulationResult::Sampled {
                    registers: names,
                    shots,
                    counts,
                    norm_drift,
                }
            }
        };

        if result.norm_drift() > self.config.norm_tolerance {
            warn!(
                norm_drift = result.norm_drift(),
                tolerance = self.config.norm_tolerance,
                "state norm drifted"
            );
        }
        debug!(
            qubits = width,
            ops = steps.len(),
            elapsed = ?start.elapsed(),
            "simulation finished"
        );
        Ok(result)
    }

    /// Run the steps once from |0...0>, collapsing at each measurement.
    #[allow(clippy::too_many_arguments)]
    fn trajectory(
        &self,
        steps: &[Step],
        width: usize,
        num_clbits: usize,
        parallel: bool,
        guard: &ProgressGuard,
        cancel: Option<&CancellationToken>,
        rng: &mut StdRng,
    ) -> SimResult<Statevector> {
        let mut state = Statevector::new(width);
        let mut clbits = vec![false; num_clbits];
        for step in steps {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(SimError::Cancelled);
            }
            match step {
                Step::Gate { kernels, condition } => {
                    let read = |b: ClbitId| clbits.get(b.index()).copied().unwrap_or(false);
                    let fires = condition.as_ref().is_none_or(|c| c.is_satisfied(read));
                    if fires {
                        for k in kernels {
                            state.apply(k, parallel);
                        }
                    }
                }
                Step::Measure { qubit, clbit } => {
                    let bit = state.measure(*qubit, rng);
                    if let Some(slot) = clbits.get_mut(*clbit) {
                        *slot = bit;
                    }
                }
            }
            guard.tick();
        }
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(SimError::Cancelled);
        }
        Ok(state)
    }
}

fn resolve_registers(
    outputs: &[OutputRegister],
    width: usize,
) -> SimResult<Vec<(String, Vec<usize>)>> {
    if outputs.is_empty() {
        return Ok(vec![("q".to_string(), (0..width).collect())]);
    }
    outputs
        .iter()
        .map(|r| {
            let qubits = r
                .qubits
                .iter()
                .map(|q| {
                    if q.index() < width {
                        Ok(q.index())
                    } else {
                        Err(SimError::InvalidRegister {
                            register: r.name.clone(),
                            qubit: q.0,
                        })
                    }
                })
                .collect::<SimResult<Vec<_>>>()?;
            Ok((r.name.clone(), qubits))
        })
        .collect()
}

/// Terminal measurements are dropped unless `collapse` is set; the final
/// state is read out instead.
fn lower_circuit(
    circuit: &Circuit,
    bindings: &ParameterBindings,
    collapse: bool,
) -> SimResult<Vec<Step>> {
    let mut steps = Vec::with_capacity(circuit.num_ops());
    for inst in circuit.instructions() {
        match &inst.kind {
            InstructionKind::Gate(gate) => {
                let params = gate
                    .kind
                    .parameters()
                    .into_iter()
                    .map(|p| p.evaluate(bindings))
                    .collect::<IrResult<Vec<f64>>>()?;
                let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
                steps.push(Step::Gate {
                    kernels: kernel::lower(&gate.kind, &qubits, &params)?,
                    condition: gate.condition.clone(),
                });
            }
            InstructionKind::Measure if collapse => {
                if let (Some(q), Some(c)) = (inst.qubits.first(), inst.clbits.first()) {
                    steps.push(Step::Measure {
                        qubit: q.index(),
                        clbit: c.index(),
                    });
                }
            }
            InstructionKind::Measure | InstructionKind::Barrier => {}
        }
    }
    Ok(steps)
}

fn read_out(index: usize, registers: &[(String, Vec<usize>)]) -> Outcome {
    registers
        .iter()
        .map(|(_, qubits)| {
            qubits
                .iter()
                .enumerate()
                .fold(0u64, |v, (k, &q)| v | ((((index >> q) & 1) as u64) << k))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> Simulator {
        Simulator::new(SimulatorConfig::default()).unwrap()
    }

    #[test]
    fn test_bell_exact() {
        let circuit = Circuit::bell().unwrap();
        let result = sim().run(&SimulationRequest::new(&circuit)).unwrap();
        assert!((result.probability(&[0b00]) - 0.5).abs() < 1e-12);
        assert!((result.probability(&[0b11]) - 0.5).abs() < 1e-12);
        assert_eq!(result.probability(&[0b01]), 0.0);
        assert!(result.norm_drift() < 1e-12);
    }

    #[test]
    fn test_bell_sampled() {
        let circuit = Circuit::bell().unwrap();
        let request = SimulationRequest::new(&circuit).with_shots(1000).with_seed(1);
        let result = sim().run(&request).unwrap();
        let counts = result.counts().unwrap();
        assert_eq!(counts.values().sum::<u64>(), 1000);
        assert!(counts.keys().all(|o| o == &vec![0b00] || o == &vec![0b11]));
    }

    #[test]
    fn test_registers_read_little_endian() {
        let mut circuit = Circuit::with_size("r", 3, 0);
        circuit.x(QubitId(0)).unwrap().x(QubitId(2)).unwrap();
        let request = SimulationRequest::new(&circuit)
            .with_register("a", &[QubitId(0), QubitId(1)])
            .with_register("b", &[QubitId(2)]);
        let result = sim().run(&request).unwrap();
        assert_eq!(result.most_likely(), Some(&vec![1, 1]));
        assert_eq!(result.registers(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_too_many_qubits() {
        let config = SimulatorConfig {
            max_qubits: 5,
            ..SimulatorConfig::default()
        };
        let circuit = Circuit::with_size("big", 10, 0);
        let err = Simulator::new(config).unwrap().run(&SimulationRequest::new(&circuit));
        assert!(matches!(err, Err(SimError::TooManyQubits { requested: 10, max: 5 })));
    }

    #[test]
    fn test_register_outside_circuit() {
        let circuit = Circuit::ghz(2).unwrap();
        let request = SimulationRequest::new(&circuit).with_register("x", &[QubitId(4)]);
        assert!(matches!(
            sim().run(&request),
            Err(SimError::InvalidRegister { qubit: 4, .. })
        ));
    }

    #[test]
    fn test_swap_moves_excitation() {
        let mut circuit = Circuit::with_size("s", 2, 0);
        circuit.x(QubitId(0)).unwrap().swap(QubitId(0), QubitId(1)).unwrap();
        let result = sim().run(&SimulationRequest::new(&circuit)).unwrap();
        assert!((result.probability(&[0b10]) - 1.0).abs() < 1e-12);
    }
}
