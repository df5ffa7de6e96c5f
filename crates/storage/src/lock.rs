// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative single-writer lock on the output root.
//!
//! Only one `process`/`resume`/`retry` invocation may hold a given output
//! root's `.state.lock` at a time. The lock file embeds the holder's PID so
//! a later invocation can tell a genuinely stale lock (holder process is
//! gone) from a live one.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("output root is locked by another process (pid {held_by})")]
    HeldByOther { held_by: u32 },
    #[error("io error acquiring lock: {0}")]
    Io(#[from] std::io::Error),
}

/// An acquired exclusive lock on an output root's `.state.lock` file.
/// Releasing (dropping) this value releases the OS-level lock.
pub struct OutputRootLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl OutputRootLock {
    /// Acquire the lock at `output_root/.state.lock`, creating the file if
    /// needed. If the lock is already held, checks whether the recorded PID
    /// is still alive and whether the file is older than `stale_age`; if
    /// both the holder is dead and the age bound is exceeded, the lock is
    /// reclaimed rather than rejected.
    pub fn acquire(output_root: &Path, stale_age: Duration) -> Result<Self, LockError> {
        fs::create_dir_all(output_root)?;
        let lock_path = output_root.join(".state.lock");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if file.try_lock_exclusive().is_err() {
            if Self::is_reclaimable(&lock_path, stale_age) {
                Self::force_clear(&lock_path)?;
                file.try_lock_exclusive()
                    .map_err(|_| LockError::HeldByOther {
                        held_by: Self::read_pid(&lock_path).unwrap_or(0),
                    })?;
            } else {
                return Err(LockError::HeldByOther {
                    held_by: Self::read_pid(&lock_path).unwrap_or(0),
                });
            }
        }

        let mut file = file;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;

        Ok(Self {
            file,
            path: lock_path,
        })
    }

    /// A lock is reclaimable only when the recorded holder PID no longer
    /// exists AND the lock file is older than `stale_age`. Age alone is not
    /// sufficient: a long-running batch with a slow annotator is expected to
    /// hold the lock for a while.
    fn is_reclaimable(lock_path: &Path, stale_age: Duration) -> bool {
        let Some(pid) = Self::read_pid(lock_path) else {
            return true;
        };
        if pid_is_alive(pid) {
            return false;
        }
        match fs::metadata(lock_path).and_then(|m| m.modified()) {
            Ok(modified) => SystemTime::now()
                .duration_since(modified)
                .map(|age| age >= stale_age)
                .unwrap_or(false),
            Err(_) => true,
        }
    }

    fn read_pid(lock_path: &Path) -> Option<u32> {
        let mut contents = String::new();
        File::open(lock_path)
            .ok()?
            .read_to_string(&mut contents)
            .ok()?;
        contents.trim().parse().ok()
    }

    fn force_clear(lock_path: &Path) -> Result<(), LockError> {
        let file = OpenOptions::new().write(true).open(lock_path)?;
        file.unlock()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn pid_is_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn pid_is_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
