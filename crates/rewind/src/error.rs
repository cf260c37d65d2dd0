#![forbid(unsafe_code)]

//! Error types for the history manager and the operations it drives.
//!
//! Two layers of failure exist:
//!
//! - [`Abort`] is raised by an operation's `perform()` when it cannot
//!   finish. The manager always answers it with a call to `compensate()`.
//! - [`HistoryError`] is what the manager itself returns to callers.

use std::fmt;

use thiserror::Error;

/// Boxed error produced by caller-supplied code (compensation failures,
/// abort causes).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for history manager calls.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors returned by [`HistoryManager`](crate::HistoryManager).
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("nothing to undo: the done timeline is empty")]
    NothingToUndo,

    #[error("nothing to redo: the undone timeline is empty")]
    NothingToRedo,

    #[error("nothing to execute: no operation is registered")]
    NothingToExecute,

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("compensation failed after {abort}")]
    CompensationFailed {
        abort: Abort,
        #[source]
        source: BoxError,
    },

    #[error("history lock poisoned by a panicking operation; discard this manager")]
    Poisoned,
}

impl HistoryError {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// True for the "no such recorded action" family: nothing to undo,
    /// redo or execute.
    #[must_use]
    pub fn is_no_such_action(&self) -> bool {
        matches!(
            self,
            Self::NothingToUndo | Self::NothingToRedo | Self::NothingToExecute
        )
    }
}

/// Where inside a multi-step `perform()` an abort happened.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checkpoint {
    /// Numeric checkpoint id, meaningful only to the operation.
    pub id: i32,
    /// Human-readable checkpoint name.
    pub name: String,
}

impl Checkpoint {
    #[must_use]
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "checkpoint {} ({})", self.id, self.name)
    }
}

/// Signal raised by `perform()` when an operation cannot complete.
///
/// Carries an optional [`Checkpoint`], an optional message and an optional
/// underlying cause. The manager hands the same value to `compensate()`
/// and then back to the caller.
#[derive(Debug, Default)]
pub struct Abort {
    checkpoint: Option<Checkpoint>,
    message: Option<String>,
    source: Option<BoxError>,
}

impl Abort {
    /// An abort with no diagnostic payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An abort raised at the given checkpoint.
    #[must_use]
    pub fn at(id: i32, name: impl Into<String>) -> Self {
        Self {
            checkpoint: Some(Checkpoint::new(id, name)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a checkpoint unless one is already set.
    #[must_use]
    pub fn or_checkpoint(mut self, id: i32, name: impl Into<String>) -> Self {
        if self.checkpoint.is_none() {
            self.checkpoint = Some(Checkpoint::new(id, name));
        }
        self
    }

    #[must_use]
    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation aborted")?;
        if let Some(checkpoint) = &self.checkpoint {
            write!(f, " at {checkpoint}")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Abort {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn abort_display_includes_checkpoint_and_message() {
        let abort = Abort::at(3, "Third").with_message("disk full");
        assert_eq!(
            abort.to_string(),
            "operation aborted at checkpoint 3 (Third): disk full"
        );
    }

    #[test]
    fn bare_abort_has_no_payload() {
        let abort = Abort::new();
        assert_eq!(abort.to_string(), "operation aborted");
        assert!(abort.checkpoint().is_none());
        assert!(abort.message().is_none());
        assert!(abort.source().is_none());
    }

    #[test]
    fn abort_exposes_cause_as_source() {
        let cause = std::io::Error::other("Test IO Exception");
        let abort = Abort::at(2, "Second").with_source(cause);
        let source = abort.source().expect("source should be set");
        assert_eq!(source.to_string(), "Test IO Exception");
    }

    #[test]
    fn or_checkpoint_keeps_existing() {
        let abort = Abort::at(7, "inner").or_checkpoint(1, "outer");
        assert_eq!(abort.checkpoint(), Some(&Checkpoint::new(7, "inner")));

        let abort = Abort::new().or_checkpoint(1, "outer");
        assert_eq!(abort.checkpoint(), Some(&Checkpoint::new(1, "outer")));
    }

    #[test]
    fn no_such_action_family() {
        assert!(HistoryError::NothingToUndo.is_no_such_action());
        assert!(HistoryError::NothingToRedo.is_no_such_action());
        assert!(HistoryError::NothingToExecute.is_no_such_action());
        assert!(!HistoryError::invalid("x").is_no_such_action());
        assert!(!HistoryError::Poisoned.is_no_such_action());
    }

    #[test]
    fn compensation_failure_chains_source() {
        let err = HistoryError::CompensationFailed {
            abort: Abort::at(1, "write"),
            source: "rollback refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "compensation failed after operation aborted at checkpoint 1 (write)"
        );
        assert_eq!(err.source().unwrap().to_string(), "rollback refused");
    }
}
