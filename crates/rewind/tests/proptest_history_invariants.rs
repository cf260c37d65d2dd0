#![forbid(unsafe_code)]

//! Property tests for [`HistoryManager`] invariants.
//!
//! Validates:
//! - Random register/undo/redo/abort sequences match a reference model.
//! - The retention limit is never exceeded on either timeline.
//! - Done and undone timelines never share an entry.
//! - Undoing everything restores the initial state; redoing restores the final one.
//! - Aborted operations leave state and timelines untouched.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rewind::{Abort, FnOp, HistoryConfig, HistoryError, HistoryManager, RetentionLimit};

// ============================================================================
// Strategy helpers
// ============================================================================

/// Calls that can be made on a HistoryManager.
#[derive(Debug, Clone)]
enum Op {
    Add(i64),
    AbortingAdd(i64),
    Undo,
    Redo,
    SetLimit(Option<usize>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (-1000i64..1000).prop_map(Op::Add),
        1 => (-1000i64..1000).prop_map(Op::AbortingAdd),
        3 => Just(Op::Undo),
        2 => Just(Op::Redo),
        1 => proptest::option::of(1usize..8).prop_map(Op::SetLimit),
    ]
}

fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 1..=max_len)
}

/// Adds `delta` to `counter`; aborting variants add it and then bail out.
fn add_op(counter: &Arc<Mutex<i64>>, delta: i64, aborts: bool) -> FnOp {
    let (up, down, fix) = (counter.clone(), counter.clone(), counter.clone());
    FnOp::new(
        format!("add {delta}"),
        move || {
            *up.lock().unwrap() += delta;
            if aborts {
                return Err(Abort::at(1, "after add"));
            }
            Ok(())
        },
        move || *down.lock().unwrap() -= delta,
    )
    .with_compensate(move |_| {
        *fix.lock().unwrap() -= delta;
        Ok(())
    })
}

/// Reference model: deltas on each timeline, newest at back.
#[derive(Debug, Default)]
struct Model {
    done: Vec<i64>,
    undone: Vec<i64>,
    limit: Option<usize>,
}

impl Model {
    fn trim(timeline: &mut Vec<i64>, limit: Option<usize>) {
        if let Some(limit) = limit
            && timeline.len() > limit
        {
            timeline.drain(..timeline.len() - limit);
        }
    }

    fn apply(&mut self, op: &Op) {
        match op {
            Op::Add(delta) => {
                self.undone.clear();
                self.done.push(*delta);
                Self::trim(&mut self.done, self.limit);
            }
            Op::AbortingAdd(_) => {}
            Op::Undo => {
                if let Some(delta) = self.done.pop() {
                    self.undone.push(delta);
                    Self::trim(&mut self.undone, self.limit);
                }
            }
            Op::Redo => {
                if let Some(delta) = self.undone.pop() {
                    self.done.push(delta);
                    Self::trim(&mut self.done, self.limit);
                }
            }
            Op::SetLimit(limit) => {
                self.limit = *limit;
                Self::trim(&mut self.done, self.limit);
                Self::trim(&mut self.undone, self.limit);
            }
        }
    }
}

fn run(history: &HistoryManager, counter: &Arc<Mutex<i64>>, op: &Op) {
    match op {
        Op::Add(delta) => {
            let outcome = history
                .register_and_execute(add_op(counter, *delta, false))
                .unwrap();
            assert!(outcome.is_applied());
        }
        Op::AbortingAdd(delta) => {
            let outcome = history
                .register_and_execute(add_op(counter, *delta, true))
                .unwrap();
            assert!(!outcome.is_applied());
        }
        Op::Undo => match history.undo() {
            Ok(_) | Err(HistoryError::NothingToUndo) => {}
            Err(other) => panic!("unexpected undo error: {other}"),
        },
        Op::Redo => match history.redo() {
            Ok(_) | Err(HistoryError::NothingToRedo) => {}
            Err(other) => panic!("unexpected redo error: {other}"),
        },
        Op::SetLimit(limit) => history.set_retention_limit(*limit).unwrap(),
    }
}

fn descriptions(deltas: impl DoubleEndedIterator<Item = i64>) -> Vec<String> {
    deltas.rev().map(|d| format!("add {d}")).collect()
}

// ============================================================================
// Invariant 1: History matches the reference model
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn timelines_match_reference_model(ops in ops_strategy(80)) {
        let history = HistoryManager::new(HistoryConfig::unlimited());
        let counter = Arc::new(Mutex::new(0i64));
        let mut model = Model::default();

        for op in &ops {
            run(&history, &counter, op);
            model.apply(op);

            let done: Vec<String> = history
                .done_snapshot()
                .into_iter()
                .map(|e| e.description)
                .collect();
            let undone: Vec<String> = history
                .undone_snapshot()
                .into_iter()
                .map(|e| e.description)
                .collect();
            prop_assert_eq!(done, descriptions(model.done.iter().copied()));
            prop_assert_eq!(undone, descriptions(model.undone.iter().copied()));
        }
    }
}

// ============================================================================
// Invariant 2: Retention limit is never exceeded
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn retention_limit_never_exceeded(
        limit in 1usize..10,
        ops in ops_strategy(100)
    ) {
        let config = HistoryConfig::new(RetentionLimit::bounded(limit).unwrap());
        let history = HistoryManager::new(config);
        let counter = Arc::new(Mutex::new(0i64));

        for op in &ops {
            // Keep the initial limit; SetLimit is exercised elsewhere.
            if matches!(op, Op::SetLimit(_)) {
                continue;
            }
            run(&history, &counter, op);
            let state = history.state();
            prop_assert!(state.undo_depth <= limit);
            prop_assert!(state.redo_depth <= limit);
        }
    }
}

// ============================================================================
// Invariant 3: Done and undone never share an entry
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn timelines_are_disjoint(ops in ops_strategy(80)) {
        let history = HistoryManager::default();
        let counter = Arc::new(Mutex::new(0i64));

        for op in &ops {
            run(&history, &counter, op);

            let done: HashSet<_> = history.done_snapshot().into_iter().map(|e| e.id).collect();
            let undone: HashSet<_> = history.undone_snapshot().into_iter().map(|e| e.id).collect();
            prop_assert!(done.is_disjoint(&undone));
        }
    }
}

// ============================================================================
// Invariant 4: Full undo/redo round trip
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn undo_all_restores_initial_and_redo_all_restores_final(
        deltas in prop::collection::vec(-1000i64..1000, 1..40)
    ) {
        let history = HistoryManager::default();
        let counter = Arc::new(Mutex::new(0i64));

        for delta in &deltas {
            run(&history, &counter, &Op::Add(*delta));
        }
        let final_value = *counter.lock().unwrap();
        prop_assert_eq!(final_value, deltas.iter().sum::<i64>());

        for _ in &deltas {
            history.undo().unwrap();
        }
        prop_assert_eq!(*counter.lock().unwrap(), 0);
        prop_assert!(matches!(history.undo(), Err(HistoryError::NothingToUndo)));

        for _ in &deltas {
            history.redo().unwrap();
        }
        prop_assert_eq!(*counter.lock().unwrap(), final_value);
        prop_assert!(matches!(history.redo(), Err(HistoryError::NothingToRedo)));
    }
}

// ============================================================================
// Invariant 5: Aborts are invisible
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn aborted_operations_change_nothing(
        ops in ops_strategy(40),
        delta in -1000i64..1000
    ) {
        let history = HistoryManager::default();
        let counter = Arc::new(Mutex::new(0i64));
        for op in &ops {
            run(&history, &counter, op);
        }

        let value_before = *counter.lock().unwrap();
        let done_before = history.done_snapshot();
        let undone_before = history.undone_snapshot();

        run(&history, &counter, &Op::AbortingAdd(delta));

        prop_assert_eq!(*counter.lock().unwrap(), value_before);
        prop_assert_eq!(history.done_snapshot(), done_before);
        prop_assert_eq!(history.undone_snapshot(), undone_before);
    }
}
