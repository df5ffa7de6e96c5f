// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use annorun_core::FakeClock;
use std::path::PathBuf;

fn manifest() -> RunManifest {
    RunManifest::new(
        "run-1".to_string(),
        0,
        2,
        PathBuf::from("/opt/annotator/bin/run"),
        1795,
        5554,
        3,
        PathBuf::from("/data/in"),
    )
}

#[test]
fn open_creates_state_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let _mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
    assert!(path.exists());
}

#[test]
fn reopen_loads_prior_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "hi").unwrap();

    {
        let mut mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
        mgr.mark_in_progress(&file).unwrap();
        mgr.mark_completed(&file, 5, 1.2).unwrap();
    }

    let mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
    assert!(mgr.is_completed(&file));
    assert_eq!(mgr.manifest().counters.completed, 1);
}

#[test]
fn mark_failed_updates_manifest_counters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "hi").unwrap();

    let mut mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
    mgr.mark_in_progress(&file).unwrap();
    mgr.mark_failed(&file, "boom".to_string(), ErrorKind::Timeout)
        .unwrap();

    assert_eq!(mgr.manifest().counters.failed, 1);
    let failed = mgr.failed_records();
    assert_eq!(failed.len(), 1);
}

#[test]
fn reset_in_progress_to_pending_recovers_crashed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "hi").unwrap();

    let mut mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
    mgr.mark_in_progress(&file).unwrap();

    let reset = mgr.reset_in_progress_to_pending().unwrap();
    assert_eq!(reset, 1);
    assert!(!mgr.is_completed(&file));
}

#[test]
fn mark_completed_on_unknown_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let missing = dir.path().join("never-tracked.txt");

    let mut mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
    let err = mgr.mark_completed(&missing, 1, 1.0).unwrap_err();
    assert!(matches!(err, StateError::NotFound(_)));
}

#[test]
fn requeue_all_failed_resets_attempts_and_clears_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "hi").unwrap();

    let mut mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
    mgr.mark_in_progress(&file).unwrap();
    mgr.mark_failed(&file, "bad xml".to_string(), ErrorKind::Parse)
        .unwrap();

    let requeued = mgr.requeue_all_failed().unwrap();
    assert_eq!(requeued.len(), 1);
    assert!(mgr.failed_records().is_empty());
    assert!(!mgr.is_completed(&file));
    assert_eq!(mgr.manifest().counters.failed, 0);
    assert_eq!(mgr.manifest().counters.retried, 1);
}

#[test]
fn requeue_all_failed_lets_a_retried_row_complete_with_clean_counters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "hi").unwrap();

    let mut mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
    mgr.mark_in_progress(&file).unwrap();
    mgr.mark_failed(&file, "bad xml".to_string(), ErrorKind::Parse)
        .unwrap();
    assert_eq!(mgr.manifest().counters.failed, 1);

    mgr.requeue_all_failed().unwrap();
    mgr.mark_in_progress(&file).unwrap();
    mgr.mark_completed(&file, 3, 0.5).unwrap();

    assert_eq!(mgr.manifest().counters.failed, 0);
    assert_eq!(mgr.manifest().counters.completed, 1);
    assert_eq!(mgr.manifest().counters.retried, 1);
}

#[test]
fn requeue_all_failed_is_a_no_op_when_nothing_failed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let mut mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
    assert!(mgr.requeue_all_failed().unwrap().is_empty());
}

#[test]
fn demote_to_pending_reverts_a_completed_row_and_its_counter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "hi").unwrap();

    let mut mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
    mgr.mark_in_progress(&file).unwrap();
    mgr.mark_completed(&file, 2, 0.5).unwrap();
    assert_eq!(mgr.manifest().counters.completed, 1);

    mgr.demote_to_pending(&file).unwrap();

    assert!(!mgr.is_completed(&file));
    assert_eq!(mgr.manifest().counters.completed, 0);
}

#[test]
fn demote_to_pending_on_a_non_completed_row_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "hi").unwrap();

    let mut mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
    mgr.mark_in_progress(&file).unwrap();
    mgr.mark_failed(&file, "boom".to_string(), ErrorKind::Timeout).unwrap();

    mgr.demote_to_pending(&file).unwrap();

    assert_eq!(mgr.manifest().counters.completed, 0);
    assert_eq!(mgr.manifest().counters.failed, 1);
}

#[test]
fn path_is_tracked_case_insensitively_on_those_platforms() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let file = dir.path().join("Report.txt");
    std::fs::write(&file, "hi").unwrap();

    let mut mgr = StateManager::open(&path, manifest(), FakeClock::default()).unwrap();
    let _ = mgr.record_for(&file);
    mgr.mark_in_progress(&file).unwrap();
    mgr.mark_completed(&file, 1, 1.0).unwrap();
    assert!(mgr.is_completed(&file));
}
