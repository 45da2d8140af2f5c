//! Symbolic state vector.
//!
//! Amplitudes are expression DAGs over the circuit's free parameters. Nodes
//! are shared through `Rc`, constants fold as the state is built, and
//! evaluation memoizes each node so a shared subexpression is computed once
//! per binding set.

use num_complex::Complex64;
use qsynth_ir::{
    Circuit, InstructionKind, ParameterBindings, ParameterExpression, StandardGate,
};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::error::{SimError, SimResult};
use crate::kernel::root_matrix;
use crate::statevector::Statevector;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

#[derive(Debug)]
enum Node {
    Const(Complex64),
    Cos(ParameterExpression),
    Sin(ParameterExpression),
    /// `e^{i p}`
    Cis(ParameterExpression),
    Add(Amplitude, Amplitude),
    Mul(Amplitude, Amplitude),
}

/// A shared amplitude expression.
#[derive(Debug, Clone)]
pub struct Amplitude(Rc<Node>);

impl Amplitude {
    fn constant(value: Complex64) -> Self {
        Amplitude(Rc::new(Node::Const(value)))
    }

    fn node(node: Node) -> Self {
        Amplitude(Rc::new(node))
    }

    /// The value if the expression is closed.
    pub fn as_constant(&self) -> Option<Complex64> {
        match *self.0 {
            Node::Const(c) => Some(c),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        self.as_constant() == Some(ZERO)
    }

    fn add(&self, other: &Amplitude) -> Amplitude {
        match (self.as_constant(), other.as_constant()) {
            (Some(a), Some(b)) => Amplitude::constant(a + b),
            _ if self.is_zero() => other.clone(),
            _ if other.is_zero() => self.clone(),
            _ => Amplitude::node(Node::Add(self.clone(), other.clone())),
        }
    }

    fn mul(&self, other: &Amplitude) -> Amplitude {
        match (self.as_constant(), other.as_constant()) {
            (Some(a), Some(b)) => Amplitude::constant(a * b),
            (Some(z), _) | (_, Some(z)) if z == ZERO => Amplitude::constant(ZERO),
            (Some(one), _) if one == ONE => other.clone(),
            (_, Some(one)) if one == ONE => self.clone(),
            _ => Amplitude::node(Node::Mul(self.clone(), other.clone())),
        }
    }

    fn evaluate(
        &self,
        bindings: &ParameterBindings,
        cache: &mut FxHashMap<usize, Complex64>,
    ) -> SimResult<Complex64> {
        let key = Rc::as_ptr(&self.0) as usize;
        if let Some(&v) = cache.get(&key) {
            return Ok(v);
        }
        let value = match &*self.0 {
            Node::Const(c) => *c,
            Node::Cos(p) => p.evaluate(bindings)?.cos().into(),
            Node::Sin(p) => p.evaluate(bindings)?.sin().into(),
            Node::Cis(p) => Complex64::from_polar(1.0, p.evaluate(bindings)?),
            Node::Add(a, b) => a.evaluate(bindings, cache)? + b.evaluate(bindings, cache)?,
            Node::Mul(a, b) => a.evaluate(bindings, cache)? * b.evaluate(bindings, cache)?,
        };
        cache.insert(key, value);
        Ok(value)
    }
}

type SymbolicMatrix = [[Amplitude; 2]; 2];

fn constant_matrix(m: [[Complex64; 2]; 2]) -> SymbolicMatrix {
    m.map(|row| row.map(Amplitude::constant))
}

/// Matrix of a one-qubit root gate whose parameters may be symbolic.
fn symbolic_matrix(gate: &StandardGate, params: &[ParameterExpression]) -> Option<SymbolicMatrix> {
    if let Some(values) = params.iter().map(ParameterExpression::as_f64).collect::<Option<Vec<_>>>()
    {
        return root_matrix(gate, &values).map(constant_matrix);
    }

    let c = Amplitude::constant;
    let half = |p: &ParameterExpression| p.clone() / ParameterExpression::constant(2.0);
    let cos = |p: ParameterExpression| Amplitude::node(Node::Cos(p));
    let sin = |p: ParameterExpression| Amplitude::node(Node::Sin(p));
    let cis = |p: ParameterExpression| Amplitude::node(Node::Cis(p));
    let minus_i = c(Complex64::new(0.0, -1.0));
    let minus_one = c(Complex64::new(-1.0, 0.0));

    let m = match gate {
        StandardGate::Rx(_) => {
            let (co, si) = (cos(half(&params[0])), sin(half(&params[0])));
            let off = minus_i.mul(&si);
            [[co.clone(), off.clone()], [off, co]]
        }
        StandardGate::Ry(_) => {
            let (co, si) = (cos(half(&params[0])), sin(half(&params[0])));
            [[co.clone(), minus_one.mul(&si)], [si, co]]
        }
        StandardGate::Rz(_) => [
            [cis(-half(&params[0])), c(ZERO)],
            [c(ZERO), cis(half(&params[0]))],
        ],
        StandardGate::P(_) => [[c(ONE), c(ZERO)], [c(ZERO), cis(params[0].clone())]],
        StandardGate::U(..) => {
            let (theta, phi, lambda) = (&params[0], &params[1], &params[2]);
            let (co, si) = (cos(half(theta)), sin(half(theta)));
            [
                [co.clone(), minus_one.mul(&cis(lambda.clone())).mul(&si)],
                [
                    cis(phi.clone()).mul(&si),
                    cis(phi.clone() + lambda.clone()).mul(&co),
                ],
            ]
        }
        _ => return None,
    };
    Some(m)
}

/// A state vector whose amplitudes are expressions over free parameters.
#[derive(Debug, Clone)]
pub struct SymbolicStatevector {
    amplitudes: Vec<Amplitude>,
    symbols: BTreeSet<String>,
    num_qubits: usize,
}

impl SymbolicStatevector {
    /// Build the state of `circuit` after substituting `bindings`.
    ///
    /// Measurements are ignored; the caller rejects dynamic circuits.
    pub(crate) fn build(
        circuit: &Circuit,
        num_qubits: usize,
        bindings: &ParameterBindings,
    ) -> SimResult<Self> {
        let mut amplitudes = vec![Amplitude::constant(ZERO); 1 << num_qubits];
        amplitudes[0] = Amplitude::constant(ONE);
        let mut symbols = BTreeSet::new();

        for inst in circuit.instructions() {
            let InstructionKind::Gate(gate) = &inst.kind else {
                continue;
            };
            let params: Vec<ParameterExpression> = gate
                .kind
                .parameters()
                .into_iter()
                .map(|p| p.bind_all(bindings).simplify())
                .collect();
            for p in &params {
                symbols.extend(p.symbols());
            }

            let (root, n) = gate.kind.split_controls();
            let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
            let n = n as usize;
            let controls = qubits[..n].iter().fold(0usize, |m, &q| m | (1 << q));

            apply_root(&mut amplitudes, &root, &params, &qubits[n..], controls)?;
        }

        Ok(Self {
            amplitudes,
            symbols,
            num_qubits,
        })
    }

    /// Free parameters remaining in the amplitudes, sorted.
    pub fn symbols(&self) -> &BTreeSet<String> {
        &self.symbols
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The amplitude expressions.
    pub fn amplitudes(&self) -> &[Amplitude] {
        &self.amplitudes
    }

    /// Substitute values for every free parameter.
    ///
    /// Fails with [`SimError::ParameterBinding`] naming the first unbound
    /// symbol in sorted order.
    pub fn evaluate(&self, bindings: &ParameterBindings) -> SimResult<Statevector> {
        if let Some(name) = self.symbols.iter().find(|s| !bindings.contains_key(*s)) {
            return Err(SimError::ParameterBinding { name: name.clone() });
        }
        let mut cache = FxHashMap::default();
        let values = self
            .amplitudes
            .iter()
            .map(|a| a.evaluate(bindings, &mut cache))
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Statevector::from_raw(values, self.num_qubits))
    }
}

/// Apply a root gate on `targets` where every bit in `controls` is set.
fn apply_root(
    amplitudes: &mut [Amplitude],
    root: &StandardGate,
    params: &[ParameterExpression],
    targets: &[usize],
    controls: usize,
) -> SimResult<()> {
    if let StandardGate::Swap = root {
        let (a, b) = (targets[0], targets[1]);
        let x = constant_matrix([[ZERO, ONE], [ONE, ZERO]]);
        apply(amplitudes, &x, b, controls | (1 << a));
        apply(amplitudes, &x, a, controls | (1 << b));
        apply(amplitudes, &x, b, controls | (1 << a));
        return Ok(());
    }
    let m = symbolic_matrix(root, params).ok_or_else(|| SimError::UnsupportedGate {
        name: root.name().to_string(),
    })?;
    apply(amplitudes, &m, targets[0], controls);
    Ok(())
}

fn apply(amplitudes: &mut [Amplitude], m: &SymbolicMatrix, target: usize, controls: usize) {
    let stride = 1usize << target;
    for base in (0..amplitudes.len()).step_by(stride * 2) {
        for i in base..base + stride {
            if i & controls != controls {
                continue;
            }
            let j = i + stride;
            let (a, b) = (amplitudes[i].clone(), amplitudes[j].clone());
            if a.is_zero() && b.is_zero() {
                continue;
            }
            amplitudes[i] = m[0][0].mul(&a).add(&m[0][1].mul(&b));
            amplitudes[j] = m[1][0].mul(&a).add(&m[1][1].mul(&b));
        }
    }
}
