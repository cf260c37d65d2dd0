#![forbid(unsafe_code)]

//! Undo/redo history of reversible operations.
//!
//! This crate provides infrastructure for undoable actions in applications
//! with one or more threads driving the same history. It implements the
//! Command Pattern with support for:
//!
//! - **Reversibility**: every operation can be inverted and reapplied
//! - **Abort/compensate**: a failing operation rolls back its partial work
//!   and is never recorded
//! - **Bounded history**: an optional retention limit per timeline
//! - **Availability notifications**: undo/redo flags pushed to UI sinks
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        HistoryManager                           │
//! │  ┌──────────────────┐          ┌──────────────────┐             │
//! │  │  Done Timeline   │          │ Undone Timeline  │             │
//! │  │  ┌────────────┐  │          │  ┌────────────┐  │             │
//! │  │  │ OpN        │  │  undo()  │  │ Op1        │  │             │
//! │  │  ├────────────┤  │ ──────►  │  ├────────────┤  │             │
//! │  │  │ Op2        │  │          │  │ Op2        │  │             │
//! │  │  ├────────────┤  │  ◄────── │  ├────────────┤  │             │
//! │  │  │ Op1        │  │  redo()  │  │ OpN        │  │             │
//! │  │  └────────────┘  │          │  └────────────┘  │             │
//! │  └──────────────────┘          └──────────────────┘             │
//! │               Mutex held for every call                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use rewind::{AvailabilityFlag, FnOp, HistoryManager};
//!
//! let text = Arc::new(Mutex::new(String::new()));
//! let undo_button = AvailabilityFlag::new();
//! let history = HistoryManager::default().with_undo_sink(undo_button.clone());
//!
//! let (t1, t2) = (text.clone(), text.clone());
//! let op = FnOp::new(
//!     "Type hello",
//!     move || {
//!         t1.lock().unwrap().push_str("hello");
//!         Ok(())
//!     },
//!     move || t2.lock().unwrap().clear(),
//! );
//!
//! history.register_and_execute(op).unwrap();
//! assert_eq!(*text.lock().unwrap(), "hello");
//! assert!(undo_button.is_available());
//!
//! history.undo().unwrap();
//! assert_eq!(*text.lock().unwrap(), "");
//!
//! history.redo().unwrap();
//! assert_eq!(*text.lock().unwrap(), "hello");
//! ```
//!
//! # Module Structure
//!
//! - [`operation`]: the [`ReversibleOp`] trait
//! - [`fn_op`] / [`batch`]: closure-backed and grouped operations
//! - [`history`]: the [`HistoryManager`]
//! - [`notify`]: availability sinks
//! - [`config`]: retention limit and configuration
//! - [`error`]: [`Abort`] and [`HistoryError`]

pub mod batch;
pub mod config;
pub mod error;
pub mod fn_op;
pub mod history;
pub mod notify;
pub mod operation;

pub use batch::OperationBatch;
pub use config::{HistoryConfig, LIMIT_ENV_VAR, RetentionLimit};
pub use error::{Abort, BoxError, Checkpoint, HistoryError, Result};
pub use fn_op::FnOp;
pub use history::{Execution, HistoryManager};
pub use notify::{AvailabilityFlag, AvailabilitySink, HistoryState};
pub use operation::{EntryInfo, OpId, ReversibleOp};
