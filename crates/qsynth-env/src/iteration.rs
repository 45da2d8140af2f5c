//! Iteration environments for backtracking-style walks.
//!
//! Each step asks one question of the current state (the predicate) and then
//! moves forward or backward depending on the answer. The shared strategy
//! computes the answer once into a flag qubit and drives both moves from it:
//! forward is controlled on the flag, backward on the flag conjugated by `X`.

use qsynth_ir::QubitId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EnvError;
use crate::frame::FrameKind;
use crate::session::Session;

/// How the predicate of an iteration step is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationStrategy {
    /// One predicate evaluation per step, shared by both directions.
    #[default]
    Shared,
    /// A separate predicate evaluation for each direction.
    Naive,
}

/// Summary of a compiled iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationReport {
    /// Number of logical steps.
    pub steps: usize,
    /// Number of times the predicate was compiled into the circuit.
    pub predicate_evaluations: usize,
}

impl Session {
    /// Compile `steps` iteration steps.
    ///
    /// `predicate(session, step, flag)` must write its answer into `flag`,
    /// a fresh qubit in |0>, reversibly. `forward` runs where the flag is set
    /// and `backward` where it is clear.
    pub fn iterate<E>(
        &mut self,
        steps: usize,
        strategy: IterationStrategy,
        mut predicate: impl FnMut(&mut Self, usize, QubitId) -> Result<(), E>,
        mut forward: impl FnMut(&mut Self, usize) -> Result<(), E>,
        mut backward: impl FnMut(&mut Self, usize) -> Result<(), E>,
    ) -> Result<IterationReport, E>
    where
        E: From<EnvError>,
    {
        let id = self.enter(FrameKind::Iteration, "iterate")?;
        let mut evaluations = 0;
        let mut result = Ok(());
        for step in 0..steps {
            result = match strategy {
                IterationStrategy::Shared => {
                    evaluations += 1;
                    self.shared_step(step, &mut predicate, &mut forward, &mut backward)
                }
                IterationStrategy::Naive => {
                    evaluations += 2;
                    self.naive_step(step, &mut predicate, &mut forward, &mut backward)
                }
            };
            if result.is_err() {
                break;
            }
        }
        self.close(id, result)?;
        debug!(steps, evaluations, ?strategy, "iteration compiled");
        Ok(IterationReport {
            steps,
            predicate_evaluations: evaluations,
        })
    }

    fn shared_step<E: From<EnvError>>(
        &mut self,
        step: usize,
        predicate: &mut impl FnMut(&mut Self, usize, QubitId) -> Result<(), E>,
        forward: &mut impl FnMut(&mut Self, usize) -> Result<(), E>,
        backward: &mut impl FnMut(&mut Self, usize) -> Result<(), E>,
    ) -> Result<(), E> {
        self.conjugate(
            "predicate",
            |s| {
                let flag = s.allocate(1, "flag")?[0];
                predicate(s, step, flag)?;
                Ok(flag)
            },
            |s, flag| {
                s.control(&[flag], |s| forward(s, step))?;
                s.conjugate(
                    "negate",
                    |s| s.x(flag).map_err(E::from),
                    |s, ()| s.control(&[flag], |s| backward(s, step)),
                )
            },
        )
    }

    fn naive_step<E: From<EnvError>>(
        &mut self,
        step: usize,
        predicate: &mut impl FnMut(&mut Self, usize, QubitId) -> Result<(), E>,
        forward: &mut impl FnMut(&mut Self, usize) -> Result<(), E>,
        backward: &mut impl FnMut(&mut Self, usize) -> Result<(), E>,
    ) -> Result<(), E> {
        self.conjugate(
            "predicate",
            |s| {
                let flag = s.allocate(1, "flag")?[0];
                predicate(s, step, flag)?;
                Ok(flag)
            },
            |s, flag| s.control(&[flag], |s| forward(s, step)),
        )?;
        self.conjugate(
            "predicate",
            |s| {
                let flag = s.allocate(1, "flag")?[0];
                predicate(s, step, flag)?;
                s.x(flag)?;
                Ok(flag)
            },
            |s, flag| s.control(&[flag], |s| backward(s, step)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnvResult;

    #[test]
    fn test_zero_steps_emits_nothing() {
        let mut s = Session::named("t");
        let report = s
            .iterate(
                0,
                IterationStrategy::Shared,
                |_, _, _| -> EnvResult<()> { Ok(()) },
                |_, _| Ok(()),
                |_, _| Ok(()),
            )
            .unwrap();
        assert_eq!(report.predicate_evaluations, 0);
        assert!(s.circuit().instructions().is_empty());
        assert_eq!(s.open_environments(), 0);
    }

    #[test]
    fn test_predicate_error_aborts() {
        let mut s = Session::named("t");
        let q = s.allocate(1, "q").unwrap()[0];
        let err = s
            .iterate(
                3,
                IterationStrategy::Shared,
                |s, step, flag| {
                    if step == 1 {
                        return Err(EnvError::NonInvertible("test".into()));
                    }
                    s.cx(q, flag)
                },
                |s, _| s.x(q),
                |s, _| s.x(q),
            )
            .unwrap_err();
        assert!(matches!(err, EnvError::NonInvertible(_)));
        assert_eq!(s.open_environments(), 0);
        assert_eq!(s.allocator().num_allocated(), 1);
    }

    #[test]
    fn test_strategy_default_is_shared() {
        assert_eq!(IterationStrategy::default(), IterationStrategy::Shared);
    }
}
