#![forbid(unsafe_code)]

//! Availability notifications for undo/redo affordances.
//!
//! The manager knows nothing about buttons or menus. It pushes a boolean
//! "available" flag to whatever [`AvailabilitySink`] the caller attached,
//! after every mutation and while still holding its lock, so observers
//! never see an intermediate state.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Receives "available / unavailable" updates for undo or redo.
///
/// Implementations run while the history lock is held: they must be quick
/// and must not call back into the same manager.
pub trait AvailabilitySink: Send + Sync {
    fn set_available(&self, available: bool);
}

impl<F> AvailabilitySink for F
where
    F: Fn(bool) + Send + Sync,
{
    fn set_available(&self, available: bool) {
        self(available);
    }
}

/// Shared boolean toggle, the simplest sink.
///
/// Clones share the same flag, so one handle can be given to the manager
/// and another polled by the UI layer.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityFlag(Arc<AtomicBool>);

impl AvailabilityFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl AvailabilitySink for AvailabilityFlag {
    fn set_available(&self, available: bool) {
        self.0.store(available, Ordering::Release);
    }
}

/// Point-in-time depth of both timelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryState {
    pub undo_depth: usize,
    pub redo_depth: usize,
}

impl HistoryState {
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo_depth > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.redo_depth > 0
    }
}

/// The two optional notification targets.
#[derive(Default)]
pub(crate) struct Sinks {
    pub(crate) undo: Option<Arc<dyn AvailabilitySink>>,
    pub(crate) redo: Option<Arc<dyn AvailabilitySink>>,
}

impl fmt::Debug for Sinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sinks")
            .field("has_undo", &self.undo.is_some())
            .field("has_redo", &self.redo.is_some())
            .finish()
    }
}

impl Sinks {
    pub(crate) fn publish(&self, state: HistoryState) {
        if let Some(sink) = &self.undo {
            sink.set_available(state.can_undo());
        }
        if let Some(sink) = &self.redo {
            sink.set_available(state.can_redo());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn flag_clones_share_state() {
        let flag = AvailabilityFlag::new();
        let handle = flag.clone();
        assert!(!handle.is_available());
        flag.set_available(true);
        assert!(handle.is_available());
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |available: bool| seen.lock().unwrap().push(available)
        };
        sink.set_available(true);
        sink.set_available(false);
        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn publish_routes_each_flag() {
        let undo = AvailabilityFlag::new();
        let redo = AvailabilityFlag::new();
        let sinks = Sinks {
            undo: Some(Arc::new(undo.clone())),
            redo: Some(Arc::new(redo.clone())),
        };

        sinks.publish(HistoryState {
            undo_depth: 2,
            redo_depth: 0,
        });
        assert!(undo.is_available());
        assert!(!redo.is_available());

        sinks.publish(HistoryState {
            undo_depth: 0,
            redo_depth: 1,
        });
        assert!(!undo.is_available());
        assert!(redo.is_available());
    }

    #[test]
    fn publish_without_sinks_is_fine() {
        Sinks::default().publish(HistoryState::default());
    }
}
