#![forbid(unsafe_code)]

//! Grouping several operations into one history entry.

use std::fmt;

use crate::error::{Abort, BoxError};
use crate::operation::ReversibleOp;

/// A batch of operations that perform, invert and reapply together.
///
/// Useful for actions that span several steps but should appear as a
/// single undo entry.
///
/// When child `k` aborts during `perform`, the batch returns the abort
/// tagged with checkpoint `k` (named after the child, unless the child set
/// its own checkpoint). The following `compensate` call then compensates
/// child `k` and inverts children `0..k` in reverse order.
pub struct OperationBatch {
    /// Operations in execution order.
    ops: Vec<Box<dyn ReversibleOp>>,
    description: String,
    /// Index of the child whose perform aborted, awaiting compensation.
    aborted_at: Option<usize>,
}

impl fmt::Debug for OperationBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationBatch")
            .field("description", &self.description)
            .field("ops_count", &self.ops.len())
            .field("aborted_at", &self.aborted_at)
            .finish()
    }
}

impl OperationBatch {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            ops: Vec::new(),
            description: description.into(),
            aborted_at: None,
        }
    }

    /// Add an operation to the batch.
    pub fn push(&mut self, op: impl ReversibleOp + 'static) {
        self.ops.push(Box::new(op));
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, op: impl ReversibleOp + 'static) -> Self {
        self.push(op);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl ReversibleOp for OperationBatch {
    fn perform(&mut self) -> Result<(), Abort> {
        self.aborted_at = None;
        for (i, op) in self.ops.iter_mut().enumerate() {
            if let Err(abort) = op.perform() {
                self.aborted_at = Some(i);
                let id = i32::try_from(i).unwrap_or(i32::MAX);
                return Err(abort.or_checkpoint(id, op.description()));
            }
        }
        Ok(())
    }

    fn invert(&mut self) {
        for op in self.ops.iter_mut().rev() {
            op.invert();
        }
    }

    fn reapply(&mut self) {
        for op in &mut self.ops {
            op.reapply();
        }
    }

    fn compensate(&mut self, abort: &Abort) -> Result<(), BoxError> {
        let Some(failed) = self.aborted_at.take() else {
            return Ok(());
        };
        self.ops[failed].compensate(abort)?;
        for op in self.ops[..failed].iter_mut().rev() {
            op.invert();
        }
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}
