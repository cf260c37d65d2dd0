#![no_main]

use std::sync::{Arc, Mutex};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rewind::{Abort, FnOp, HistoryError, HistoryManager, OperationBatch};

#[derive(Debug, Arbitrary)]
enum Call {
    Add(i16),
    AbortingAdd(i16),
    Batch(Vec<i16>, bool),
    Register(i16),
    ExecuteMostRecent,
    Undo,
    Redo,
    SetLimit(Option<u8>),
    Clear,
}

fn add_op(value: &Arc<Mutex<i64>>, delta: i16, aborts: bool) -> FnOp {
    let delta = i64::from(delta);
    let (up, down, fix) = (value.clone(), value.clone(), value.clone());
    FnOp::new(
        "add",
        move || {
            *up.lock().unwrap() += delta;
            if aborts {
                return Err(Abort::at(0, "fuzz"));
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

fuzz_target!(|calls: Vec<Call>| {
    let history = HistoryManager::default();
    let value = Arc::new(Mutex::new(0i64));
    let mut limit: Option<usize> = None;

    for call in calls.into_iter().take(256) {
        let before = *value.lock().unwrap();
        match call {
            Call::Add(delta) => {
                assert!(history.register_and_execute(add_op(&value, delta, false)).is_ok());
            }
            Call::AbortingAdd(delta) => {
                let done_before = history.done_snapshot();
                let outcome = history
                    .register_and_execute(add_op(&value, delta, true))
                    .unwrap();
                assert!(!outcome.is_applied());
                assert_eq!(*value.lock().unwrap(), before, "abort leaked state");
                assert_eq!(history.done_snapshot(), done_before);
            }
            Call::Batch(deltas, fail_last) => {
                let mut batch = OperationBatch::new("batch");
                let count = deltas.len().min(16);
                for (i, delta) in deltas.into_iter().take(16).enumerate() {
                    batch.push(add_op(&value, delta, fail_last && i + 1 == count));
                }
                let outcome = history.register_and_execute(batch).unwrap();
                if !outcome.is_applied() {
                    assert_eq!(*value.lock().unwrap(), before, "batch abort leaked state");
                }
            }
            Call::Register(delta) => {
                assert!(history.register(add_op(&value, delta, false)).is_ok());
                assert_eq!(history.redo_depth(), 0);
            }
            Call::ExecuteMostRecent => match history.execute_most_recent() {
                Ok(_) | Err(HistoryError::NothingToExecute) => {}
                Err(e) => panic!("execute_most_recent: {e}"),
            },
            Call::Undo => match history.undo() {
                Ok(_) | Err(HistoryError::NothingToUndo) => {}
                Err(e) => panic!("undo: {e}"),
            },
            Call::Redo => match history.redo() {
                Ok(_) | Err(HistoryError::NothingToRedo) => {}
                Err(e) => panic!("redo: {e}"),
            },
            Call::SetLimit(max) => {
                let max = max.map(usize::from);
                let result = history.set_retention_limit(max);
                if max == Some(0) {
                    assert!(matches!(result, Err(HistoryError::InvalidArgument { .. })));
                } else {
                    assert!(result.is_ok());
                    limit = max;
                }
            }
            Call::Clear => {
                history.clear().unwrap();
            }
        }

        // Post-conditions that must always hold:
        let state = history.state();
        if let Some(limit) = limit {
            assert!(state.undo_depth <= limit, "done exceeds limit");
            assert!(state.redo_depth <= limit, "undone exceeds limit");
        }
        let done = history.done_snapshot();
        let undone = history.undone_snapshot();
        assert!(
            done.iter().all(|d| undone.iter().all(|u| u.id != d.id)),
            "timelines overlap"
        );
    }
});
