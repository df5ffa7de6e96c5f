// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pending_record_has_zero_attempts() {
    let record = FileRecord::pending();
    assert_eq!(record.status, FileStatus::Pending);
    assert_eq!(record.attempts, 0);
}

#[test]
fn mark_in_progress_increments_attempts() {
    let mut record = FileRecord::pending();
    record.mark_in_progress(1_000);
    assert_eq!(record.status, FileStatus::InProgress);
    assert_eq!(record.attempts, 1);
    record.mark_failed("boom".to_string(), ErrorKind::Timeout);
    record.mark_in_progress(2_000);
    assert_eq!(record.attempts, 2);
}

#[test]
fn completed_implies_at_least_one_attempt() {
    let mut record = FileRecord::pending();
    record.mark_in_progress(1_000);
    record.mark_completed(12, 3.5);
    assert!(record.attempts >= 1);
    assert!(record.is_completed());
    assert!(record.last_error.is_none());
}

#[test]
fn failed_record_clears_on_subsequent_success() {
    let mut record = FileRecord::pending();
    record.mark_in_progress(1_000);
    record.mark_failed("parse error".to_string(), ErrorKind::Parse);
    assert!(!record.is_completed());
    assert!(!record.is_retriable());

    record.mark_in_progress(2_000);
    record.mark_completed(3, 1.0);
    assert!(record.last_error.is_none());
    assert!(record.last_error_kind.is_none());
}

#[test]
fn reset_in_progress_to_pending_only_affects_in_progress_rows() {
    let mut completed = FileRecord::pending();
    completed.mark_in_progress(1_000);
    completed.mark_completed(1, 1.0);
    completed.reset_in_progress_to_pending();
    assert_eq!(completed.status, FileStatus::Completed);

    let mut stuck = FileRecord::pending();
    stuck.mark_in_progress(1_000);
    stuck.reset_in_progress_to_pending();
    assert_eq!(stuck.status, FileStatus::Pending);
}

#[test]
fn retriable_depends_on_error_kind() {
    let mut timeout = FileRecord::pending();
    timeout.mark_in_progress(1_000);
    timeout.mark_failed("timed out".to_string(), ErrorKind::Timeout);
    assert!(timeout.is_retriable());

    let mut parse = FileRecord::pending();
    parse.mark_in_progress(1_000);
    parse.mark_failed("bad xml".to_string(), ErrorKind::Parse);
    assert!(!parse.is_retriable());
}

#[test]
fn requeue_for_retry_resets_attempts_even_for_non_retriable_kinds() {
    let mut record = FileRecord::pending();
    record.mark_in_progress(1_000);
    record.mark_failed("bad xml".to_string(), ErrorKind::Parse);
    record.mark_in_progress(2_000);
    record.mark_failed("bad xml again".to_string(), ErrorKind::Parse);
    assert_eq!(record.attempts, 2);

    record.requeue_for_retry();
    assert_eq!(record.status, FileStatus::Pending);
    assert_eq!(record.attempts, 0);
    assert!(record.last_error.is_none());
    assert!(record.last_error_kind.is_none());
}
