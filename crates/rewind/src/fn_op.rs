#![forbid(unsafe_code)]

//! Closure-backed operations.
//!
//! Callers that do not want a dedicated type per operation can build one
//! from closures. The closures own whatever handles they need (typically
//! an `Arc<Mutex<_>>` around the edited state), so the operation can live
//! in history without borrowing anything.

use std::fmt;

use crate::error::{Abort, BoxError};
use crate::operation::ReversibleOp;

/// Callback performing the effect.
pub type PerformFn = Box<dyn FnMut() -> Result<(), Abort> + Send>;
/// Callback for an infallible step (invert or reapply).
pub type StepFn = Box<dyn FnMut() + Send>;
/// Callback compensating an aborted perform.
pub type CompensateFn = Box<dyn FnMut(&Abort) -> Result<(), BoxError> + Send>;

/// An operation assembled from closures.
///
/// Without an explicit reapply callback, `reapply()` runs the perform
/// callback again, which is only correct for deterministic effects.
pub struct FnOp {
    description: String,
    perform: PerformFn,
    invert: StepFn,
    reapply: Option<StepFn>,
    compensate: Option<CompensateFn>,
}

impl fmt::Debug for FnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOp")
            .field("description", &self.description)
            .field("has_reapply", &self.reapply.is_some())
            .field("has_compensate", &self.compensate.is_some())
            .finish()
    }
}

impl FnOp {
    #[must_use]
    pub fn new<P, I>(description: impl Into<String>, perform: P, invert: I) -> Self
    where
        P: FnMut() -> Result<(), Abort> + Send + 'static,
        I: FnMut() + Send + 'static,
    {
        Self {
            description: description.into(),
            perform: Box::new(perform),
            invert: Box::new(invert),
            reapply: None,
            compensate: None,
        }
    }

    /// Set the reapply callback.
    #[must_use]
    pub fn with_reapply<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.reapply = Some(Box::new(f));
        self
    }

    /// Set the compensate callback.
    #[must_use]
    pub fn with_compensate<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Abort) -> Result<(), BoxError> + Send + 'static,
    {
        self.compensate = Some(Box::new(f));
        self
    }
}

impl ReversibleOp for FnOp {
    fn perform(&mut self) -> Result<(), Abort> {
        (self.perform)()
    }

    fn invert(&mut self) {
        (self.invert)();
    }

    /// # Panics
    ///
    /// Panics if no reapply callback is set and re-running perform aborts.
    fn reapply(&mut self) {
        match self.reapply.as_mut() {
            Some(reapply) => reapply(),
            None => {
                if let Err(abort) = (self.perform)() {
                    panic!("reapply of `{}` aborted: {abort}", self.description);
                }
            }
        }
    }

    fn compensate(&mut self, abort: &Abort) -> Result<(), BoxError> {
        match self.compensate.as_mut() {
            Some(compensate) => compensate(abort),
            None => Ok(()),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn counter_op(value: &Arc<Mutex<i32>>) -> FnOp {
        let up = Arc::clone(value);
        let down = Arc::clone(value);
        FnOp::new(
            "Increment",
            move || {
                *up.lock().unwrap() += 1;
                Ok(())
            },
            move || *down.lock().unwrap() -= 1,
        )
    }

    #[test]
    fn reapply_defaults_to_perform() {
        let value = Arc::new(Mutex::new(0));
        let mut op = counter_op(&value);

        op.perform().unwrap();
        op.invert();
        assert_eq!(*value.lock().unwrap(), 0);
        op.reapply();
        assert_eq!(*value.lock().unwrap(), 1);
    }

    #[test]
    fn explicit_reapply_replays_recorded_value() {
        let value = Arc::new(Mutex::new(0u32));
        let recorded = Arc::new(Mutex::new(None));

        let (v1, v2, v3) = (value.clone(), value.clone(), value.clone());
        let (r1, r2) = (recorded.clone(), recorded.clone());
        let mut roll = 4;
        let mut op = FnOp::new(
            "Roll",
            move || {
                roll += 1;
                *r1.lock().unwrap() = Some(roll);
                *v1.lock().unwrap() = roll;
                Ok(())
            },
            move || *v2.lock().unwrap() = 0,
        )
        .with_reapply(move || {
            *v3.lock().unwrap() = r2.lock().unwrap().expect("performed before reapply");
        });

        op.perform().unwrap();
        assert_eq!(*value.lock().unwrap(), 5);
        op.invert();
        op.reapply();
        assert_eq!(*value.lock().unwrap(), 5);
    }

    #[test]
    fn compensate_defaults_to_success() {
        let value = Arc::new(Mutex::new(0));
        let mut op = counter_op(&value);
        assert!(op.compensate(&Abort::new()).is_ok());
    }

    #[test]
    fn compensate_callback_sees_abort() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let mut op = FnOp::new("Fail", || Err(Abort::at(3, "Third")), || {}).with_compensate(
            move |abort| {
                *sink.lock().unwrap() = abort.checkpoint().map(|c| c.id);
                Ok(())
            },
        );

        let abort = op.perform().unwrap_err();
        op.compensate(&abort).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(3));
    }

    #[test]
    #[should_panic(expected = "reapply of `Flaky` aborted")]
    fn reapply_through_aborting_perform_panics() {
        let mut op = FnOp::new("Flaky", || Err(Abort::new()), || {});
        op.reapply();
    }

    #[test]
    fn debug_impl() {
        let op = FnOp::new("Noop", || Ok(()), || {});
        let debug = format!("{op:?}");
        assert!(debug.contains("FnOp"));
        assert!(debug.contains("Noop"));
    }
}
