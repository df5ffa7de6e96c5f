// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state manager: atomic, crash-safe persistence of [`FileRecord`] rows
//! and the [`RunManifest`], keyed by normalized file path.
//!
//! Every mutation goes through [`StateManager`], which serializes the whole
//! table to a temp file, `sync_all()`s it, then `rename()`s it over the
//! live file. A crash mid-write leaves the previous, still-valid snapshot
//! on disk.

use annorun_core::{path_key, Clock, ErrorKind, FileRecord, FileStatus, RunManifest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no record for {0}")]
    NotFound(String),
}

/// On-disk shape of the state file: manifest plus every tracked row.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateFile {
    manifest: RunManifest,
    records: BTreeMap<String, FileRecord>,
}

/// Owns `FileRecord` and `RunManifest` persistence for one output root.
/// Every other component communicates with it by method call, never by
/// touching the on-disk file directly.
pub struct StateManager<C: Clock> {
    path: PathBuf,
    state: StateFile,
    clock: C,
}

impl<C: Clock> StateManager<C> {
    /// Load existing state at `path`, or create a fresh one seeded from
    /// `manifest` if the file doesn't exist yet.
    pub fn open(path: &Path, manifest: RunManifest, clock: C) -> Result<Self, StateError> {
        let state = match Self::load(path) {
            Ok(Some(loaded)) => loaded,
            Ok(None) => StateFile {
                manifest,
                records: BTreeMap::new(),
            },
            Err(e) => {
                warn!(error = %e, path = %path.display(), "corrupt state file, starting fresh");
                StateFile {
                    manifest,
                    records: BTreeMap::new(),
                }
            }
        };
        let mut mgr = Self {
            path: path.to_path_buf(),
            state,
            clock,
        };
        mgr.save()?;
        Ok(mgr)
    }

    fn load(path: &Path) -> Result<Option<StateFile>, StateError> {
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    /// Write the whole table atomically: temp file, fsync, rename.
    fn save(&self) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &self.state)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn key(&self, path: &Path) -> String {
        path_key(path)
    }

    /// Fetch or create a pending row for `path`.
    pub fn record_for(&mut self, path: &Path) -> FileRecord {
        let key = self.key(path);
        self.state
            .records
            .entry(key)
            .or_insert_with(FileRecord::pending)
            .clone()
    }

    pub fn mark_in_progress(&mut self, path: &Path) -> Result<(), StateError> {
        let key = self.key(path);
        let now = self.clock.now_ms();
        let record = self.state.records.entry(key).or_insert_with(FileRecord::pending);
        record.mark_in_progress(now);
        self.save()
    }

    pub fn mark_completed(
        &mut self,
        path: &Path,
        concepts_extracted: u64,
        processing_seconds: f64,
    ) -> Result<(), StateError> {
        let key = self.key(path);
        let now = self.clock.now_ms();
        let record = self
            .state
            .records
            .get_mut(&key)
            .ok_or_else(|| StateError::NotFound(key.clone()))?;
        record.mark_completed(concepts_extracted, processing_seconds);
        self.state.manifest.record_completed(now);
        self.save()
    }

    pub fn mark_failed(
        &mut self,
        path: &Path,
        error: String,
        kind: ErrorKind,
    ) -> Result<(), StateError> {
        let key = self.key(path);
        let now = self.clock.now_ms();
        let record = self
            .state
            .records
            .get_mut(&key)
            .ok_or_else(|| StateError::NotFound(key.clone()))?;
        record.mark_failed(error, kind);
        self.state.manifest.record_failed(now);
        self.save()
    }

    /// Demote a `completed` row back to `pending` because its completion
    /// proof (a terminated CSV on disk) failed to check out on resume, and
    /// reconcile the manifest's `completed` counter to match. A no-op if
    /// the row isn't currently `completed`.
    pub fn demote_to_pending(&mut self, path: &Path) -> Result<(), StateError> {
        let key = self.key(path);
        let now = self.clock.now_ms();
        let record = self
            .state
            .records
            .get_mut(&key)
            .ok_or_else(|| StateError::NotFound(key.clone()))?;
        if record.status != FileStatus::Completed {
            return Ok(());
        }
        record.demote_to_pending();
        self.state.manifest.demote_completed(now);
        self.save()
    }

    pub fn is_completed(&self, path: &Path) -> bool {
        let key = self.key(path);
        self.state
            .records
            .get(&key)
            .map(FileRecord::is_completed)
            .unwrap_or(false)
    }

    /// On startup, any row left `in_progress` means the prior run crashed
    /// mid-file; reset those rows to `pending` so they get picked up again.
    pub fn reset_in_progress_to_pending(&mut self) -> Result<usize, StateError> {
        let mut reset_count = 0;
        for record in self.state.records.values_mut() {
            if record.status == FileStatus::InProgress {
                record.reset_in_progress_to_pending();
                reset_count += 1;
            }
        }
        if reset_count > 0 {
            self.save()?;
        }
        Ok(reset_count)
    }

    /// All failed rows, for the retry controller.
    pub fn failed_records(&self) -> Vec<(String, FileRecord)> {
        self.state
            .records
            .iter()
            .filter(|(_, r)| r.status == FileStatus::Failed)
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect()
    }

    /// Re-queue every failed row as `pending` with a reset attempt
    /// counter, for `retry_failed_only` batches. Returns the normalized
    /// path keys that were re-queued.
    ///
    /// Each requeued row moves out of `counters.failed` and into
    /// `counters.retried` immediately, since it's no longer failed the
    /// moment it's back in the pending queue; a subsequent `mark_failed`
    /// on the same row re-adds it to `counters.failed` on its own terms.
    pub fn requeue_all_failed(&mut self) -> Result<Vec<String>, StateError> {
        let now = self.clock.now_ms();
        let mut requeued = Vec::new();
        for (key, record) in self.state.records.iter_mut() {
            if record.status == FileStatus::Failed {
                record.requeue_for_retry();
                requeued.push(key.clone());
            }
        }
        for _ in &requeued {
            self.state.manifest.record_retried(now);
        }
        if !requeued.is_empty() {
            self.save()?;
        }
        Ok(requeued)
    }

    /// A read-only snapshot of the whole table, for the `status` command.
    pub fn snapshot(&self) -> Vec<(String, FileRecord)> {
        self.state
            .records
            .iter()
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect()
    }

    pub fn manifest(&self) -> &RunManifest {
        &self.state.manifest
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
