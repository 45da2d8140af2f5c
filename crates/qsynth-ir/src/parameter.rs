//! Symbolic gate parameters.
//!
//! Angles in synthesized fragments are usually concrete, but callers can leave
//! any gate angle symbolic and bind it later at simulation time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;
use std::fmt;

use crate::error::{IrError, IrResult};

/// Values for free symbols, keyed by symbol name.
pub type ParameterBindings = BTreeMap<String, f64>;

/// A symbolic or concrete parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// A named free symbol.
    Symbol(String),
    /// The constant π.
    Pi,
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Addition.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Subtraction.
    Sub(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Multiplication.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Division.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
}

impl ParameterExpression {
    /// A constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// A free symbol.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// The constant π.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// Whether the expression mentions any symbol.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Neg(e) => e.is_symbolic(),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Concrete value, if the expression is closed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterExpression::Constant(v) => Some(*v),
            ParameterExpression::Symbol(_) => None,
            ParameterExpression::Pi => Some(PI),
            ParameterExpression::Neg(e) => e.as_f64().map(|v| -v),
            ParameterExpression::Add(a, b) => Some(a.as_f64()? + b.as_f64()?),
            ParameterExpression::Sub(a, b) => Some(a.as_f64()? - b.as_f64()?),
            ParameterExpression::Mul(a, b) => Some(a.as_f64()? * b.as_f64()?),
            ParameterExpression::Div(a, b) => {
                let divisor = b.as_f64()?;
                if divisor == 0.0 {
                    return None;
                }
                Some(a.as_f64()? / divisor)
            }
        }
    }

    /// Evaluate against a set of bindings.
    ///
    /// Fails with [`IrError::UnboundParameter`] naming the first missing symbol
    /// in sorted order, so the reported name does not depend on tree shape.
    pub fn evaluate(&self, bindings: &ParameterBindings) -> IrResult<f64> {
        if let Some(missing) = self
            .symbols()
            .into_iter()
            .find(|name| !bindings.contains_key(name))
        {
            return Err(IrError::UnboundParameter(missing));
        }
        let value = self.eval_bound(bindings);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(IrError::NonFiniteParameter(self.to_string()))
        }
    }

    fn eval_bound(&self, bindings: &ParameterBindings) -> f64 {
        match self {
            ParameterExpression::Constant(v) => *v,
            ParameterExpression::Symbol(name) => bindings.get(name).copied().unwrap_or(f64::NAN),
            ParameterExpression::Pi => PI,
            ParameterExpression::Neg(e) => -e.eval_bound(bindings),
            ParameterExpression::Add(a, b) => a.eval_bound(bindings) + b.eval_bound(bindings),
            ParameterExpression::Sub(a, b) => a.eval_bound(bindings) - b.eval_bound(bindings),
            ParameterExpression::Mul(a, b) => a.eval_bound(bindings) * b.eval_bound(bindings),
            ParameterExpression::Div(a, b) => a.eval_bound(bindings) / b.eval_bound(bindings),
        }
    }

    /// All symbol names, sorted.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols(&self, set: &mut BTreeSet<String>) {
        match self {
            ParameterExpression::Constant(_) | ParameterExpression::Pi => {}
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Neg(e) => e.collect_symbols(set),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Substitute every bound symbol and fold what becomes constant.
    ///
    /// Symbols missing from `bindings` stay free.
    pub fn bind_all(&self, bindings: &ParameterBindings) -> Self {
        let bound = self.map_symbols(&|name| bindings.get(name).copied());
        bound.simplify()
    }

    /// Bind a single symbol.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        self.map_symbols(&|n| (n == name).then_some(value))
    }

    fn map_symbols(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Self {
        let rebox = |e: &ParameterExpression| Box::new(e.map_symbols(lookup));
        match self {
            ParameterExpression::Symbol(n) => match lookup(n) {
                Some(v) => ParameterExpression::Constant(v),
                None => self.clone(),
            },
            ParameterExpression::Constant(_) | ParameterExpression::Pi => self.clone(),
            ParameterExpression::Neg(e) => ParameterExpression::Neg(rebox(e)),
            ParameterExpression::Add(a, b) => ParameterExpression::Add(rebox(a), rebox(b)),
            ParameterExpression::Sub(a, b) => ParameterExpression::Sub(rebox(a), rebox(b)),
            ParameterExpression::Mul(a, b) => ParameterExpression::Mul(rebox(a), rebox(b)),
            ParameterExpression::Div(a, b) => ParameterExpression::Div(rebox(a), rebox(b)),
        }
    }

    /// Fold constant subexpressions.
    pub fn simplify(&self) -> Self {
        if let Some(v) = self.as_f64() {
            return ParameterExpression::Constant(v);
        }
        let fold = |a: &ParameterExpression,
                    b: &ParameterExpression,
                    op: fn(f64, f64) -> Option<f64>,
                    build: fn(Box<Self>, Box<Self>) -> Self| {
            let a = a.simplify();
            let b = b.simplify();
            match (a.as_f64(), b.as_f64()) {
                (Some(av), Some(bv)) => match op(av, bv) {
                    Some(v) => ParameterExpression::Constant(v),
                    None => build(Box::new(a), Box::new(b)),
                },
                _ => build(Box::new(a), Box::new(b)),
            }
        };
        match self {
            ParameterExpression::Neg(e) => {
                let e = e.simplify();
                match e.as_f64() {
                    Some(v) => ParameterExpression::Constant(-v),
                    None => ParameterExpression::Neg(Box::new(e)),
                }
            }
            ParameterExpression::Add(a, b) => fold(a, b, |x, y| Some(x + y), ParameterExpression::Add),
            ParameterExpression::Sub(a, b) => fold(a, b, |x, y| Some(x - y), ParameterExpression::Sub),
            ParameterExpression::Mul(a, b) => fold(a, b, |x, y| Some(x * y), ParameterExpression::Mul),
            ParameterExpression::Div(a, b) => fold(
                a,
                b,
                |x, y| (y != 0.0).then(|| x / y),
                ParameterExpression::Div,
            ),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
            ParameterExpression::Pi => write!(f, "π"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            ParameterExpression::Add(a, b) => write!(f, "({a} + {b})"),
            ParameterExpression::Sub(a, b) => write!(f, "({a} - {b})"),
            ParameterExpression::Mul(a, b) => write!(f, "({a} * {b})"),
            ParameterExpression::Div(a, b) => write!(f, "({a} / {b})"),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<i32> for ParameterExpression {
    fn from(value: i32) -> Self {
        ParameterExpression::Constant(f64::from(value))
    }
}

impl From<&str> for ParameterExpression {
    fn from(name: &str) -> Self {
        ParameterExpression::Symbol(name.to_string())
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        ParameterExpression::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ParameterExpression::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self {
            ParameterExpression::Constant(v) => ParameterExpression::Constant(-v),
            ParameterExpression::Neg(inner) => *inner,
            other => ParameterExpression::Neg(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let p = ParameterExpression::constant(1.5);
        assert!(!p.is_symbolic());
        assert_eq!(p.as_f64(), Some(1.5));
    }

    #[test]
    fn test_symbol() {
        let p = ParameterExpression::symbol("theta");
        assert!(p.is_symbolic());
        assert_eq!(p.as_f64(), None);
        assert!(p.symbols().contains("theta"));
    }

    #[test]
    fn test_evaluate_with_bindings() {
        let p = ParameterExpression::symbol("theta") * ParameterExpression::constant(2.0);
        let mut b = ParameterBindings::new();
        b.insert("theta".into(), PI / 4.0);
        assert!((p.evaluate(&b).unwrap() - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_reports_first_missing_symbol() {
        let p = ParameterExpression::symbol("zeta") + ParameterExpression::symbol("alpha");
        let err = p.evaluate(&ParameterBindings::new()).unwrap_err();
        assert!(matches!(err, IrError::UnboundParameter(ref n) if n == "alpha"));
    }

    #[test]
    fn test_bind_all_partial() {
        let p = ParameterExpression::symbol("a") + ParameterExpression::symbol("b");
        let mut b = ParameterBindings::new();
        b.insert("a".into(), 1.0);
        let partial = p.bind_all(&b);
        assert!(partial.is_symbolic());
        assert_eq!(partial.symbols().into_iter().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(partial.bind("b", 2.0).simplify().as_f64(), Some(3.0));
    }

    #[test]
    fn test_double_negation_cancels() {
        let p = -(-ParameterExpression::symbol("x"));
        assert_eq!(p, ParameterExpression::symbol("x"));
    }

    #[test]
    fn test_division_by_zero_is_not_finite() {
        let p = ParameterExpression::constant(1.0) / ParameterExpression::symbol("d");
        let mut b = ParameterBindings::new();
        b.insert("d".into(), 0.0);
        assert!(matches!(p.evaluate(&b), Err(IrError::NonFiniteParameter(_))));
    }
}
