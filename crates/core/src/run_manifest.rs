// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run manifest persisted at the output root, owned exclusively by the
//! state manager and updated atomically after each state transition.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema version of [`RunManifest`]. Bump when the on-disk shape changes
/// in a way that requires a migration on load.
pub const RUN_MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Aggregate counters tracked across the lifetime of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub completed: u64,
    pub failed: u64,
    pub retried: u64,
}

/// The run manifest, created on first run and preserved across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub schema_version: u32,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub pool_size: usize,
    pub annotator_bin: PathBuf,
    pub tagger_port: u16,
    pub wsd_port: u16,
    pub total_files: u64,
    pub counters: RunCounters,
    /// Input directory this run reads from, so `resume` can recover it
    /// without the caller having to pass it again.
    pub input_dir: PathBuf,
}

impl RunManifest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: String,
        now_ms: u64,
        pool_size: usize,
        annotator_bin: PathBuf,
        tagger_port: u16,
        wsd_port: u16,
        total_files: u64,
        input_dir: PathBuf,
    ) -> Self {
        Self {
            run_id,
            schema_version: RUN_MANIFEST_SCHEMA_VERSION,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            pool_size,
            annotator_bin,
            tagger_port,
            wsd_port,
            total_files,
            counters: RunCounters::default(),
            input_dir,
        }
    }

    pub fn record_completed(&mut self, now_ms: u64) {
        self.counters.completed += 1;
        self.updated_at_ms = now_ms;
    }

    pub fn record_failed(&mut self, now_ms: u64) {
        self.counters.failed += 1;
        self.updated_at_ms = now_ms;
    }

    /// A row already counted in `failed` is being requeued for another
    /// attempt: move it out of the failed bucket into retried so the
    /// counters still sum to a true picture of the run.
    pub fn record_retried(&mut self, now_ms: u64) {
        self.counters.failed = self.counters.failed.saturating_sub(1);
        self.counters.retried += 1;
        self.updated_at_ms = now_ms;
    }

    /// A row previously counted as `completed` turned out not to have a
    /// valid completion proof on disk and was demoted back to pending.
    pub fn demote_completed(&mut self, now_ms: u64) {
        self.counters.completed = self.counters.completed.saturating_sub(1);
        self.updated_at_ms = now_ms;
    }

    /// Files neither completed nor failed yet.
    pub fn outstanding(&self) -> u64 {
        self.total_files
            .saturating_sub(self.counters.completed + self.counters.failed)
    }
}

#[cfg(test)]
#[path = "run_manifest_tests.rs"]
mod tests;
