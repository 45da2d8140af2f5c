//! Closure-scoped environments.
//!
//! Each helper opens a frame, runs the body and closes the frame. A body that
//! returns an error aborts its frame instead: nothing further is emitted and
//! the frame's qubits are reclaimed.

use qsynth_ir::{ClassicalCondition, ClbitId, QubitId};

use crate::error::EnvError;
use crate::frame::{FrameId, FrameKind};
use crate::session::Session;

impl Session {
    /// Run `compute`, then `action`, then the adjoint of `compute`.
    ///
    /// Qubits allocated in `compute` are compute ancillae: they are restored
    /// by the automatic inverse and reclaimed at exit. The value returned by
    /// `compute` is handed to `action`.
    ///
    /// ```
    /// use qsynth_env::{EnvError, Session};
    ///
    /// let mut s = Session::named("doc");
    /// let q = s.allocate(2, "q")?;
    /// s.conjugate(
    ///     "basis",
    ///     |s| s.h(q[0]),
    ///     |s, ()| s.cx(q[0], q[1]),
    /// )?;
    /// assert_eq!(s.circuit().num_ops(), 3);
    /// # Ok::<(), EnvError>(())
    /// ```
    pub fn conjugate<T, R, E>(
        &mut self,
        label: &str,
        compute: impl FnOnce(&mut Self) -> Result<T, E>,
        action: impl FnOnce(&mut Self, T) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<EnvError>,
    {
        let id = self.enter(FrameKind::Conjugation, label)?;
        let result = match compute(self) {
            Ok(value) => match self.begin_action() {
                Ok(()) => action(self, value),
                Err(err) => Err(err.into()),
            },
            Err(err) => Err(err),
        };
        self.close(id, result)
    }

    /// Run `body` with every unbalanced operation controlled on `controls`.
    pub fn control<R, E>(
        &mut self,
        controls: &[QubitId],
        body: impl FnOnce(&mut Self) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<EnvError>,
    {
        let id = self.enter(FrameKind::Controlled(controls.to_vec()), "control")?;
        let result = body(self);
        self.close(id, result)
    }

    /// Run `body` with every unbalanced gate conditioned on `clbits`
    /// reading `value` (bit `i` of `value` for `clbits[i]`).
    pub fn control_classical<R, E>(
        &mut self,
        clbits: &[ClbitId],
        value: u64,
        body: impl FnOnce(&mut Self) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<EnvError>,
    {
        let condition = ClassicalCondition::new(clbits, value);
        let id = self.enter(FrameKind::ClassicalControl(condition), "if")?;
        let result = body(self);
        self.close(id, result)
    }

    /// Emit the adjoint of `body` instead of `body`.
    pub fn invert<R, E>(&mut self, body: impl FnOnce(&mut Self) -> Result<R, E>) -> Result<R, E>
    where
        E: From<EnvError>,
    {
        let id = self.enter(FrameKind::Inversion, "invert")?;
        let result = body(self);
        self.close(id, result)
    }

    /// Run `body` in a plain ownership scope.
    ///
    /// Qubits allocated in the scope are reclaimed at exit unless exported;
    /// each must be back in |0> or the exit fails.
    pub fn scope<R, E>(
        &mut self,
        label: &str,
        body: impl FnOnce(&mut Self) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<EnvError>,
    {
        let id = self.enter(FrameKind::Scope, label)?;
        let result = body(self);
        self.close(id, result)
    }

    pub(crate) fn close<R, E>(&mut self, id: FrameId, result: Result<R, E>) -> Result<R, E>
    where
        E: From<EnvError>,
    {
        match result {
            Ok(value) => {
                self.exit(id)?;
                Ok(value)
            }
            Err(err) => {
                self.abort(id);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnvResult;
    use qsynth_ir::{Gate, ResourceError, StandardGate};

    fn names(s: &Session) -> Vec<String> {
        s.circuit()
            .instructions()
            .iter()
            .map(|i| i.name().to_string())
            .collect()
    }

    #[test]
    fn test_conjugate_compute_ancilla_is_reclaimed() {
        let mut s = Session::named("t");
        let q = s.allocate(2, "q").unwrap();
        let out = s.allocate(1, "out").unwrap()[0];
        s.conjugate(
            "and",
            |s| -> EnvResult<QubitId> {
                let anc = s.allocate(1, "anc")?[0];
                s.ccx(q[0], q[1], anc)?;
                Ok(anc)
            },
            |s, anc| s.cx(anc, out),
        )
        .unwrap();
        assert_eq!(names(&s), vec!["ccx", "cx", "ccx"]);
        assert_eq!(s.allocator().num_allocated(), 3);
        assert_eq!(s.allocator().peak(), 4);
    }

    #[test]
    fn test_action_writing_compute_ancilla_leaks() {
        let mut s = Session::named("t");
        let q = s.allocate(1, "q").unwrap()[0];
        let err = s
            .conjugate(
                "bad",
                |s| -> EnvResult<QubitId> {
                    let anc = s.allocate(1, "anc")?[0];
                    s.cx(q, anc)?;
                    Ok(anc)
                },
                |s, anc| s.x(anc),
            )
            .unwrap_err();
        assert!(matches!(err, EnvError::Uncomputation { ref fragment, .. } if fragment == "bad"));
        assert_eq!(s.allocator().num_allocated(), 1);
        assert!(!s.is_poisoned());
    }

    #[test]
    fn test_phase_on_superposed_ancilla_leaks() {
        let mut s = Session::named("t");
        let err = s
            .conjugate(
                "phase",
                |s| -> EnvResult<QubitId> {
                    let anc = s.allocate(1, "anc")?[0];
                    s.h(anc)?;
                    Ok(anc)
                },
                |s, anc| s.z(anc),
            )
            .unwrap_err();
        assert!(matches!(err, EnvError::Uncomputation { .. }));
    }

    #[test]
    fn test_control_lifts_body() {
        let mut s = Session::named("t");
        let c = s.allocate(2, "c").unwrap();
        let t = s.allocate(1, "t").unwrap()[0];
        s.control(&c, |s| -> EnvResult<()> {
            s.x(t)?;
            s.rz(0.5, t)
        })
        .unwrap();
        assert_eq!(names(&s), vec!["ccx", "c2rz"]);
        assert_eq!(s.circuit().instructions()[0].qubits, vec![c[0], c[1], t]);
    }

    #[test]
    fn test_control_classical_conditions_gates() {
        let mut s = Session::named("t");
        let q = s.allocate(2, "q").unwrap();
        let m = s.measure(q[0]).unwrap();
        s.control_classical(&[m], 1, |s| s.x(q[1])).unwrap();
        let last = s.circuit().instructions().last().unwrap();
        assert!(last.is_conditional());
        assert!(s.circuit().is_dynamic());
    }

    #[test]
    fn test_measure_inside_control_rejected() {
        let mut s = Session::named("t");
        let q = s.allocate(2, "q").unwrap();
        let err = s.control(&[q[0]], |s| s.measure(q[1])).unwrap_err();
        assert!(matches!(
            err,
            EnvError::Uncontrollable { frame: "controlled", .. }
        ));
        assert_eq!(s.open_environments(), 0);
    }

    #[test]
    fn test_invert_reverses_and_adjoints() {
        let mut s = Session::named("t");
        let q = s.allocate(1, "q").unwrap()[0];
        s.invert(|s| -> EnvResult<()> {
            s.h(q)?;
            s.t(q)?;
            s.apply(Gate::standard(StandardGate::S).with_label("phase"), &[q])
        })
        .unwrap();
        assert_eq!(names(&s), vec!["sdg", "tdg", "h"]);
        assert_eq!(s.circuit().instructions()[0].label(), Some("phase_dg"));
    }

    #[test]
    fn test_scope_export_survives() {
        let mut s = Session::named("t");
        let kept = s
            .scope("make", |s| -> EnvResult<QubitId> {
                let q = s.allocate(1, "r")?[0];
                s.x(q)?;
                s.export(&[q])?;
                Ok(q)
            })
            .unwrap();
        assert!(s.allocator().is_live(kept));
        assert!(matches!(
            s.release(&[kept]),
            Err(EnvError::Uncomputation { .. })
        ));
    }

    #[test]
    fn test_export_under_classical_control_rejected() {
        let mut s = Session::named("t");
        let q = s.allocate(1, "q").unwrap()[0];
        let m = s.measure(q).unwrap();
        let err = s
            .control_classical(&[m], 1, |s| -> EnvResult<()> {
                let r = s.allocate(1, "r")?;
                s.export(&r)
            })
            .unwrap_err();
        assert!(matches!(err, EnvError::CarryValue(_)));
        assert_eq!(s.allocator().num_allocated(), 1);
    }

    #[test]
    fn test_export_compute_ancilla_rejected() {
        let mut s = Session::named("t");
        let err = s
            .conjugate(
                "c",
                |s| -> EnvResult<()> {
                    let a = s.allocate(1, "a")?;
                    s.export(&a)
                },
                |_, ()| Ok::<(), EnvError>(()),
            )
            .unwrap_err();
        assert!(matches!(err, EnvError::InvalidExport { .. }));
    }

    #[test]
    fn test_allocate_in_invert_aborts_frame() {
        let mut s = Session::named("t");
        let err = s.invert(|s| s.allocate(1, "a")).unwrap_err();
        assert!(matches!(
            err,
            EnvError::Resource(ResourceError::AllocationInInversion)
        ));
        assert_eq!(s.open_environments(), 0);
        assert!(s.circuit().instructions().is_empty());
    }

    #[test]
    fn test_custom_error_type_propagates() {
        #[derive(Debug)]
        enum AppError {
            Env(EnvError),
            Rejected,
        }
        impl From<EnvError> for AppError {
            fn from(e: EnvError) -> Self {
                AppError::Env(e)
            }
        }

        let mut s = Session::named("t");
        let result: Result<(), AppError> = s.scope("app", |s| {
            s.allocate(1, "a")?;
            Err(AppError::Rejected)
        });
        assert!(matches!(result, Err(AppError::Rejected)));
        assert_eq!(s.allocator().num_allocated(), 0);

        let result: Result<(), AppError> = s.scope("app", |s| {
            let a = s.allocate(1, "a")?[0];
            s.x(a)?;
            Ok(())
        });
        assert!(matches!(
            result,
            Err(AppError::Env(EnvError::Uncomputation { .. }))
        ));
    }
}
