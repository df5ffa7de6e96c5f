// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup resource check: refuses to start a batch if the process's open
//! file descriptor limit is clearly insufficient for the configured pool
//! size, per the resource-limits guidance in the concurrency model.

use thiserror::Error;

/// File descriptors one leased instance can hold open at once: the temp
/// input file, the temp XML output file, the child's three standard
/// streams, and a share of the state file handle.
const FDS_PER_INSTANCE: u64 = 6;

/// Sockets reserved for the tagger/WSD daemon connections.
const DAEMON_SOCKET_RESERVE: u64 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("open file descriptor limit {limit} is below the {required} required for a pool of {pool_size}")]
pub struct InsufficientFileDescriptors {
    pub limit: u64,
    pub required: u64,
    pub pool_size: usize,
}

/// The number of open file descriptors a batch of `pool_size` workers is
/// expected to need at peak.
pub fn required_fds(pool_size: usize) -> u64 {
    (pool_size as u64) * FDS_PER_INSTANCE + DAEMON_SOCKET_RESERVE
}

/// Compare the current process's soft `RLIMIT_NOFILE` against the budget
/// for `pool_size`. Returns `Ok(())` when sufficient.
#[cfg(unix)]
pub fn check_fd_budget(pool_size: usize) -> Result<(), InsufficientFileDescriptors> {
    use nix::sys::resource::{getrlimit, Resource};

    let required = required_fds(pool_size);
    let (soft, _hard) = getrlimit(Resource::RLIMIT_NOFILE).unwrap_or((u64::MAX, u64::MAX));
    if soft < required {
        return Err(InsufficientFileDescriptors { limit: soft, required, pool_size });
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn check_fd_budget(_pool_size: usize) -> Result<(), InsufficientFileDescriptors> {
    Ok(())
}

#[cfg(test)]
#[path = "preflight_tests.rs"]
mod tests;
