#![forbid(unsafe_code)]

//! Thread-safe history of reversible operations.
//!
//! This module provides the [`HistoryManager`] which maintains a done
//! timeline and an undone timeline with support for:
//!
//! - **Retention limits**: each timeline keeps at most `L` entries, oldest
//!   evicted first
//! - **Branch handling**: registering a new operation clears the undone
//!   timeline
//! - **Abort/compensate**: an operation whose `perform()` aborts is
//!   compensated and never recorded
//! - **Availability sinks**: undo/redo availability is pushed to external
//!   observers after every mutation
//!
//! # Invariants
//!
//! 1. The done and undone timelines are disjoint
//! 2. `done.len() <= L` and `undone.len() <= L` after any operation
//! 3. The undone timeline is empty right after a registration
//! 4. An operation whose `perform()` aborted is on neither timeline
//!
//! # Concurrency
//!
//! Every call runs entirely inside one mutex, including the nested
//! `perform`/`invert`/`reapply`/`compensate`. An operation that blocks
//! stalls all other callers of the same manager, and an operation that
//! calls back into its own manager deadlocks. A panic inside an operation
//! poisons the mutex; every later mutating call then returns
//! [`HistoryError::Poisoned`].
//!
//! ```text
//! register(op5)
//! ┌───────────────────────────────────────────────┐
//! │ Done:   [op1, op2, op3, op4, op5]             │
//! │ Undone: []                                    │
//! └───────────────────────────────────────────────┘
//!
//! undo() x2
//! ┌───────────────────────────────────────────────┐
//! │ Done:   [op1, op2, op3]                       │
//! │ Undone: [op5, op4]                            │
//! └───────────────────────────────────────────────┘
//!
//! register(op6)  <-- new branch, clears undone
//! ┌───────────────────────────────────────────────┐
//! │ Done:   [op1, op2, op3, op6]                  │
//! │ Undone: []                                    │
//! └───────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{HistoryConfig, RetentionLimit};
use crate::error::{Abort, HistoryError, Result};
use crate::notify::{AvailabilitySink, HistoryState, Sinks};
use crate::operation::{EntryInfo, OpId, ReversibleOp};

/// Outcome of a call that performs an operation.
#[derive(Debug)]
pub enum Execution {
    /// `perform()` succeeded and the operation is on the done timeline.
    Applied(OpId),
    /// `perform()` aborted and `compensate()` succeeded. The operation
    /// was discarded.
    Compensated(Abort),
}

impl Execution {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    #[must_use]
    pub fn id(&self) -> Option<OpId> {
        match self {
            Self::Applied(id) => Some(*id),
            Self::Compensated(_) => None,
        }
    }

    #[must_use]
    pub fn abort(&self) -> Option<&Abort> {
        match self {
            Self::Applied(_) => None,
            Self::Compensated(abort) => Some(abort),
        }
    }
}

struct Entry {
    id: OpId,
    op: Box<dyn ReversibleOp>,
}

impl Entry {
    fn info(&self) -> EntryInfo {
        EntryInfo {
            id: self.id,
            description: self.op.description().to_string(),
        }
    }
}

/// Everything guarded by the manager's lock.
struct Timelines {
    /// Performed operations (newest at back).
    done: VecDeque<Entry>,
    /// Inverted operations eligible for redo (newest at back).
    undone: VecDeque<Entry>,
    limit: RetentionLimit,
    next_id: u64,
    sinks: Sinks,
}

impl Timelines {
    fn new(config: HistoryConfig) -> Self {
        Self {
            done: VecDeque::new(),
            undone: VecDeque::new(),
            limit: config.limit,
            next_id: 1,
            sinks: Sinks::default(),
        }
    }

    fn state(&self) -> HistoryState {
        HistoryState {
            undo_depth: self.done.len(),
            redo_depth: self.undone.len(),
        }
    }

    fn publish(&self) {
        self.sinks.publish(self.state());
    }

    /// Record a new operation on the done timeline and drop the redo branch.
    fn record(&mut self, op: Box<dyn ReversibleOp>) -> OpId {
        let id = OpId::new(self.next_id);
        self.next_id += 1;

        self.clear_undone();
        self.done.push_back(Entry { id, op });
        evict(&mut self.done, self.limit, "done");
        id
    }

    fn clear_undone(&mut self) {
        if !self.undone.is_empty() {
            tracing::trace!(dropped = self.undone.len(), "redo branch discarded");
            self.undone.clear();
        }
    }

    fn push_done(&mut self, entry: Entry) {
        self.done.push_back(entry);
        evict(&mut self.done, self.limit, "done");
    }

    fn push_undone(&mut self, entry: Entry) {
        self.undone.push_back(entry);
        evict(&mut self.undone, self.limit, "undone");
    }
}

/// Drop the oldest entries until `timeline` fits `limit`.
fn evict(timeline: &mut VecDeque<Entry>, limit: RetentionLimit, name: &'static str) {
    while limit.is_exceeded_by(timeline.len()) {
        let Some(entry) = timeline.pop_front() else {
            break;
        };
        tracing::trace!(
            timeline = name,
            op_id = entry.id.raw(),
            description = entry.op.description(),
            %limit,
            "evicted oldest entry"
        );
    }
}

/// Run the compensation protocol for an aborted `perform()`.
fn compensate(op: &mut dyn ReversibleOp, abort: Abort) -> Result<Abort> {
    tracing::warn!(
        description = op.description(),
        %abort,
        "perform aborted, compensating"
    );
    match op.compensate(&abort) {
        Ok(()) => Ok(abort),
        Err(source) => {
            tracing::warn!(
                description = op.description(),
                error = %source,
                "compensation failed"
            );
            Err(HistoryError::CompensationFailed { abort, source })
        }
    }
}

/// Manager for undo/redo history.
///
/// Share it between threads with an `Arc`. Independent instances have
/// independent locks and timelines.
pub struct HistoryManager {
    inner: Mutex<Timelines>,
}

impl fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timelines = self.read();
        f.debug_struct("HistoryManager")
            .field("undo_depth", &timelines.done.len())
            .field("redo_depth", &timelines.undone.len())
            .field("limit", &timelines.limit)
            .field("sinks", &timelines.sinks)
            .finish()
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryManager {
    /// Create a new history manager with the given configuration.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            inner: Mutex::new(Timelines::new(config)),
        }
    }

    /// Attach the "undo available" sink at construction time.
    #[must_use]
    pub fn with_undo_sink(mut self, sink: impl AvailabilitySink + 'static) -> Self {
        let timelines = self
            .inner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        sink.set_available(timelines.state().can_undo());
        timelines.sinks.undo = Some(Arc::new(sink));
        self
    }

    /// Attach the "redo available" sink at construction time.
    #[must_use]
    pub fn with_redo_sink(mut self, sink: impl AvailabilitySink + 'static) -> Self {
        let timelines = self
            .inner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        sink.set_available(timelines.state().can_redo());
        timelines.sinks.redo = Some(Arc::new(sink));
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Timelines>> {
        self.inner.lock().map_err(|_| HistoryError::Poisoned)
    }

    /// Lock for read-only access, tolerating poison.
    fn read(&self) -> MutexGuard<'_, Timelines> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Record an operation on the done timeline without performing it.
    ///
    /// Clears the undone timeline and enforces the retention limit. Use
    /// [`execute_most_recent`](Self::execute_most_recent) to perform it later.
    pub fn register(&self, op: impl ReversibleOp + 'static) -> Result<OpId> {
        let mut timelines = self.lock()?;
        let op: Box<dyn ReversibleOp> = Box::new(op);
        let description = op.description().to_string();

        let id = timelines.record(op);
        timelines.publish();
        tracing::debug!(
            op_id = id.raw(),
            description = %description,
            undo_depth = timelines.done.len(),
            "operation registered"
        );
        Ok(id)
    }

    /// Perform an operation and, if it succeeds, record it.
    ///
    /// On [`Abort`] the operation is compensated and discarded: the result
    /// is [`Execution::Compensated`], or
    /// [`HistoryError::CompensationFailed`] if compensation itself failed.
    pub fn register_and_execute(&self, op: impl ReversibleOp + 'static) -> Result<Execution> {
        let mut timelines = self.lock()?;
        let mut op: Box<dyn ReversibleOp> = Box::new(op);
        let _span =
            tracing::debug_span!("history.execute", description = %op.description()).entered();

        match op.perform() {
            Ok(()) => {
                let id = timelines.record(op);
                timelines.publish();
                tracing::debug!(
                    op_id = id.raw(),
                    undo_depth = timelines.done.len(),
                    "operation performed and registered"
                );
                Ok(Execution::Applied(id))
            }
            Err(abort) => compensate(op.as_mut(), abort).map(Execution::Compensated),
        }
    }

    /// Perform the operation at the head of the done timeline.
    ///
    /// Meant for callers that [`register`](Self::register) first and
    /// execute later. On success the undone timeline is cleared, as for any
    /// new action. On [`Abort`] the head is compensated and removed from the
    /// done timeline.
    pub fn execute_most_recent(&self) -> Result<Execution> {
        let mut timelines = self.lock()?;
        let Some(mut entry) = timelines.done.pop_back() else {
            return Err(HistoryError::NothingToExecute);
        };
        let _span = tracing::debug_span!(
            "history.execute",
            op_id = entry.id.raw(),
            description = %entry.op.description()
        )
        .entered();

        match entry.op.perform() {
            Ok(()) => {
                let id = entry.id;
                timelines.done.push_back(entry);
                timelines.clear_undone();
                timelines.publish();
                tracing::debug!(op_id = id.raw(), "most recent operation performed");
                Ok(Execution::Applied(id))
            }
            Err(abort) => {
                let result = compensate(entry.op.as_mut(), abort);
                timelines.publish();
                result.map(Execution::Compensated)
            }
        }
    }

    /// Undo the most recent operation.
    ///
    /// Moves it from the done timeline to the undone timeline and calls
    /// `invert()`. Fails with [`HistoryError::NothingToUndo`] when there is
    /// nothing to undo, leaving both timelines untouched.
    pub fn undo(&self) -> Result<OpId> {
        let mut timelines = self.lock()?;
        let Some(mut entry) = timelines.done.pop_back() else {
            return Err(HistoryError::NothingToUndo);
        };

        entry.op.invert();
        let id = entry.id;
        tracing::debug!(
            op_id = id.raw(),
            description = entry.op.description(),
            undo_depth = timelines.done.len(),
            redo_depth = timelines.undone.len() + 1,
            "operation undone"
        );
        timelines.push_undone(entry);
        timelines.publish();
        Ok(id)
    }

    /// Redo the most recently undone operation.
    ///
    /// Moves it from the undone timeline to the done timeline and calls
    /// `reapply()`. Fails with [`HistoryError::NothingToRedo`] when there is
    /// nothing to redo, leaving both timelines untouched.
    pub fn redo(&self) -> Result<OpId> {
        let mut timelines = self.lock()?;
        let Some(mut entry) = timelines.undone.pop_back() else {
            return Err(HistoryError::NothingToRedo);
        };

        entry.op.reapply();
        let id = entry.id;
        tracing::debug!(
            op_id = id.raw(),
            description = entry.op.description(),
            undo_depth = timelines.done.len() + 1,
            redo_depth = timelines.undone.len(),
            "operation redone"
        );
        timelines.push_done(entry);
        timelines.publish();
        Ok(id)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Change the retention limit. `None` means unbounded.
    ///
    /// Zero is rejected with [`HistoryError::InvalidArgument`] and nothing
    /// changes. A lower limit trims both timelines right away, oldest
    /// entries first.
    pub fn set_retention_limit(&self, max: Option<usize>) -> Result<()> {
        let limit = RetentionLimit::from_option(max)?;
        let mut timelines = self.lock()?;
        timelines.limit = limit;
        evict(&mut timelines.done, limit, "done");
        evict(&mut timelines.undone, limit, "undone");
        timelines.publish();
        tracing::debug!(%limit, "retention limit changed");
        Ok(())
    }

    /// The current retention limit.
    #[must_use]
    pub fn retention_limit(&self) -> RetentionLimit {
        self.read().limit
    }

    /// Replace the "undo available" sink. The sink receives the current
    /// availability immediately.
    pub fn set_undo_sink(&self, sink: impl AvailabilitySink + 'static) -> Result<()> {
        let mut timelines = self.lock()?;
        sink.set_available(timelines.state().can_undo());
        timelines.sinks.undo = Some(Arc::new(sink));
        Ok(())
    }

    /// Replace the "redo available" sink. The sink receives the current
    /// availability immediately.
    pub fn set_redo_sink(&self, sink: impl AvailabilitySink + 'static) -> Result<()> {
        let mut timelines = self.lock()?;
        sink.set_available(timelines.state().can_redo());
        timelines.sinks.redo = Some(Arc::new(sink));
        Ok(())
    }

    /// Detach both sinks.
    pub fn clear_sinks(&self) -> Result<()> {
        self.lock()?.sinks = Sinks::default();
        Ok(())
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// Snapshot of the done timeline, most recent first.
    #[must_use]
    pub fn done_snapshot(&self) -> Vec<EntryInfo> {
        self.read().done.iter().rev().map(Entry::info).collect()
    }

    /// Snapshot of the undone timeline, most recent first.
    #[must_use]
    pub fn undone_snapshot(&self) -> Vec<EntryInfo> {
        self.read().undone.iter().rev().map(Entry::info).collect()
    }

    /// Depth of both timelines.
    #[must_use]
    pub fn state(&self) -> HistoryState {
        self.read().state()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.state().can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.state().can_redo()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.state().undo_depth
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.state().redo_depth
    }

    /// Description of the operation `undo()` would invert.
    #[must_use]
    pub fn next_undo_description(&self) -> Option<String> {
        self.read()
            .done
            .back()
            .map(|entry| entry.op.description().to_string())
    }

    /// Description of the operation `redo()` would reapply.
    #[must_use]
    pub fn next_redo_description(&self) -> Option<String> {
        self.read()
            .undone
            .back()
            .map(|entry| entry.op.description().to_string())
    }

    /// Whether an operation panicked while the lock was held.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.inner.is_poisoned()
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Drop both timelines.
    pub fn clear(&self) -> Result<()> {
        let mut timelines = self.lock()?;
        timelines.done.clear();
        timelines.undone.clear();
        timelines.publish();
        tracing::debug!("history cleared");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
