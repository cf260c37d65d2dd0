#![forbid(unsafe_code)]

//! The reversible operation contract.
//!
//! # Invariants
//!
//! - `perform()` followed by `invert()` restores the prior state exactly
//! - `invert()` followed by `reapply()` restores the performed state exactly
//! - `compensate()` is only ever called right after `perform()` aborted
//!
//! # Failure Modes
//!
//! - **Abort**: `perform()` returns [`Abort`]; the manager calls
//!   `compensate()` with it and never records the operation.
//! - **Panicking invert/reapply**: treated as a broken contract. The panic
//!   unwinds through the manager, poisoning it.

use std::fmt;

use crate::error::{Abort, BoxError};

/// Identity the manager assigns to every operation it records.
///
/// Ids increase monotonically per manager instance and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(u64);

impl OpId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read-only view of one timeline entry, as returned by the peek accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub id: OpId,
    pub description: String,
}

/// A unit of work that can be performed, inverted and reapplied.
///
/// Separating `reapply` from `perform` lets operations with
/// non-deterministic effects (a random pick, the current time) replay the
/// outcome they recorded instead of computing a new one. Deterministic,
/// idempotent operations can simply delegate `reapply` to `perform`.
///
/// Implementations must not call back into the manager that drives them.
pub trait ReversibleOp: Send {
    /// Execute the effect for the first time.
    fn perform(&mut self) -> Result<(), Abort>;

    /// Reverse the effect of the latest `perform` or `reapply`.
    fn invert(&mut self);

    /// Re-execute the effect after an `invert`.
    fn reapply(&mut self);

    /// Undo the partial side effects of a `perform` that returned `abort`.
    ///
    /// The default does nothing, which suits operations that abort before
    /// touching any state.
    fn compensate(&mut self, abort: &Abort) -> Result<(), BoxError> {
        let _ = abort;
        Ok(())
    }

    /// Human-readable description for UI display and logs.
    fn description(&self) -> &str {
        "Operation"
    }
}

impl<T: ReversibleOp + ?Sized> ReversibleOp for Box<T> {
    fn perform(&mut self) -> Result<(), Abort> {
        (**self).perform()
    }

    fn invert(&mut self) {
        (**self).invert();
    }

    fn reapply(&mut self) {
        (**self).reapply();
    }

    fn compensate(&mut self, abort: &Abort) -> Result<(), BoxError> {
        (**self).compensate(abort)
    }

    fn description(&self) -> &str {
        (**self).description()
    }
}

impl fmt::Debug for dyn ReversibleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReversibleOp")
            .field("description", &self.description())
            .finish()
    }
}
