//! Registry lookups, per-session serialization and sweep result ordering

mod common;

use common::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::thread;
use tapesim_core::config::SimConfig;
use tapesim_core::prelude::*;
use tapesim_core::strategy::{Idle, SweepJob, SweepRunner};
use tapesim_core::SessionId;

#[test]
fn test_unknown_session_lookup_and_delete() {
    let registry = SessionRegistry::new(SimConfig::default());
    let missing = SessionId::from("sess-0000");
    assert!(matches!(registry.get(&missing), Err(SimError::SessionNotFound(_))));
    assert!(!registry.delete(&missing));
}

#[test]
fn test_sessions_are_independent() {
    let (_dir, path) = write_tape(&four_event_lines());
    let registry = SessionRegistry::new(SimConfig::default());
    let a = registry.create(&path).unwrap();
    let b = registry.create(&path).unwrap();
    assert_ne!(a, b);

    registry.with_session(&a, |s| s.step(4)).unwrap().unwrap();
    let state_b = registry.with_session(&b, |s| s.get_state()).unwrap();
    assert_eq!(state_b.cursor, 0);
    assert_eq!(registry.ids().len(), 2);
}

#[test]
fn test_concurrent_calls_on_one_session_are_serialized() {
    let lines = busy_lines(400);
    let (_dir, path) = write_tape(&lines);
    let registry = Arc::new(SessionRegistry::new(SimConfig::default()));
    let id = registry.create(&path).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    let handle = registry.get(&id).unwrap();
                    let mut session = handle.lock();
                    session.step(1).unwrap();
                    let side = if worker % 2 == 0 { Side::Buy } else { Side::Sell };
                    let _ = session.submit_order("A", side, dec!(0.50), dec!(1));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let state = registry.with_session(&id, |s| s.get_state()).unwrap();
    assert_eq!(state.cursor, 100);
    assert_eq!(state.order_count, 100);
    let actions = registry.with_session(&id, |s| s.actions().len()).unwrap();
    assert_eq!(actions, 200);
}

#[test]
fn test_sweep_results_in_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut jobs = Vec::new();
    // Alternate long and short tapes so completion order differs from submission order
    for i in 0..8u64 {
        let n = if i % 2 == 0 { 400 } else { 5 };
        let path = dir.path().join(format!("tape-{i}.jsonl"));
        let mut body = busy_lines(n).join("\n");
        body.push('\n');
        std::fs::write(&path, body).unwrap();
        jobs.push(SweepJob {
            label: format!("job-{i}"),
            tape_path: path,
            config: SimConfig::default(),
            strategy: Box::new(Idle),
            artifact_dir: (i == 3).then(|| dir.path().join("artifacts-3")),
        });
    }

    let outcomes = SweepRunner::new(3, 10).run(jobs);
    assert_eq!(outcomes.len(), 8);
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.index, i);
        assert_eq!(outcome.label, format!("job-{i}"));
        let report = outcome.result.as_ref().unwrap();
        let expected_events = if i % 2 == 0 { 401 } else { 6 };
        assert_eq!(report.final_state.total_events, expected_events);
        assert!(report.final_state.done);
    }
    assert!(dir.path().join("artifacts-3").join("run_manifest.json").exists());
}
