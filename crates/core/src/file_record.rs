// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state manager's per-file row.

use crate::error_kind::ErrorKind;
use serde::{Deserialize, Serialize};

/// Lifecycle state of one tracked input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::InProgress => "in_progress",
            FileStatus::Completed => "completed",
            FileStatus::Failed => "failed",
        }
    }
}

/// A single row in the persisted state manager, keyed externally by the
/// file's normalized path (see [`crate::path_key::path_key`]).
///
/// Invariant: `status == Completed` implies `attempts >= 1` and a
/// corresponding CSV with a terminal marker exists on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub status: FileStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concepts_extracted: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_seconds: Option<f64>,
}

impl FileRecord {
    /// A brand new row for a file that has not been attempted yet.
    pub fn pending() -> Self {
        Self {
            status: FileStatus::Pending,
            attempts: 0,
            last_error: None,
            last_error_kind: None,
            last_attempt_at: None,
            concepts_extracted: None,
            processing_seconds: None,
        }
    }

    /// Transition into `in_progress`, incrementing the attempt counter.
    pub fn mark_in_progress(&mut self, now_ms: u64) {
        self.status = FileStatus::InProgress;
        self.attempts += 1;
        self.last_attempt_at = Some(now_ms);
    }

    /// Transition into `completed`.
    pub fn mark_completed(&mut self, concepts_extracted: u64, processing_seconds: f64) {
        self.status = FileStatus::Completed;
        self.last_error = None;
        self.last_error_kind = None;
        self.concepts_extracted = Some(concepts_extracted);
        self.processing_seconds = Some(processing_seconds);
    }

    /// Transition into `failed`, recording the error.
    pub fn mark_failed(&mut self, error: String, kind: ErrorKind) {
        self.status = FileStatus::Failed;
        self.last_error = Some(error);
        self.last_error_kind = Some(kind);
    }

    /// Reset a row stuck `in_progress` (from a crash) back to `pending`,
    /// without losing its attempt history.
    pub fn reset_in_progress_to_pending(&mut self) {
        if self.status == FileStatus::InProgress {
            self.status = FileStatus::Pending;
        }
    }

    /// Re-queue a `failed` row for a fresh retry batch, resetting the
    /// attempt counter and clearing the last error. Used by
    /// `retry_failed_only` mode, which re-queues every failed row
    /// regardless of how many attempts it already burned.
    pub fn requeue_for_retry(&mut self) {
        self.status = FileStatus::Pending;
        self.attempts = 0;
        self.last_error = None;
        self.last_error_kind = None;
    }

    /// Demote a row that claims `completed` back to `pending`, for when the
    /// on-disk completion proof (a terminated CSV) is missing or stale.
    /// Attempt history is kept; only the status changes.
    pub fn demote_to_pending(&mut self) {
        self.status = FileStatus::Pending;
    }

    pub fn is_completed(&self) -> bool {
        self.status == FileStatus::Completed
    }

    pub fn is_retriable(&self) -> bool {
        self.status == FileStatus::Failed
            && self.last_error_kind.map(ErrorKind::is_retriable).unwrap_or(true)
    }
}

#[cfg(test)]
#[path = "file_record_tests.rs"]
mod tests;
