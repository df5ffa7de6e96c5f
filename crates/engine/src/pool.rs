// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded pool of annotator instances leased out to dispatcher threads.
//!
//! Internal state is a single mutex-guarded `PoolState`, with a condvar for
//! callers waiting on a lease. This mirrors the single-mutex-plus-condvar
//! design called for explicitly: all operations are safe for concurrent
//! callers, and leases are granted in FIFO order of waiting requests.

use annorun_core::{Classify, Clock, ErrorKind, IdGen, Instance, InstanceId, InstanceState};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no instance became available within the lease timeout")]
    PoolExhausted,
    #[error("pool has been shut down")]
    ShuttingDown,
}

impl Classify for PoolError {
    fn classify(&self) -> ErrorKind {
        ErrorKind::PoolExhausted
    }
}

/// What happened to a job run on a leased instance, reported back to
/// [`InstancePool::release`] so health policy can act on it.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseOutcome {
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    pub signaled: bool,
}

impl ReleaseOutcome {
    pub fn success() -> Self {
        Self { succeeded: true, exit_code: Some(0), signaled: false }
    }

    pub fn failure(exit_code: Option<i32>, signaled: bool) -> Self {
        Self { succeeded: false, exit_code, signaled }
    }

    fn is_unhealthy_signal(&self) -> bool {
        !self.succeeded && (self.signaled || self.exit_code.map(|c| c != 0).unwrap_or(true))
    }
}

const CONSECUTIVE_FAILURE_LIMIT: u32 = 3;

struct Tracked {
    instance: Instance,
    consecutive_failures: u32,
}

struct PoolState {
    slots: HashMap<InstanceId, Tracked>,
    max_size: usize,
    instance_file_limit: u32,
    shutting_down: bool,
}

/// Maintains up to `max_size` Instances, handing out leases in FIFO order
/// and retiring unhealthy instances lazily on next lease.
pub struct InstancePool<C: Clock, G: IdGen> {
    state: Mutex<PoolState>,
    available: Condvar,
    clock: C,
    id_gen: G,
}

impl<C: Clock, G: IdGen> InstancePool<C, G> {
    pub fn new(max_size: usize, instance_file_limit: u32, clock: C, id_gen: G) -> Self {
        Self {
            state: Mutex::new(PoolState {
                slots: HashMap::new(),
                max_size,
                instance_file_limit,
                shutting_down: false,
            }),
            available: Condvar::new(),
            clock,
            id_gen,
        }
    }

    /// Returns an idle, healthy instance, starting a new one if under
    /// capacity, blocking up to `timeout` otherwise.
    pub fn lease(&self, timeout: Duration) -> Result<Instance, PoolError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        loop {
            if state.shutting_down {
                return Err(PoolError::ShuttingDown);
            }

            self.reap_unhealthy(&mut state);

            if let Some(tracked) = state
                .slots
                .values_mut()
                .find(|t| t.instance.is_available())
            {
                tracked.instance.lease();
                return Ok(tracked.instance.clone());
            }

            if state.slots.len() < state.max_size {
                let id = InstanceId::new(self.id_gen.next());
                let mut instance = Instance::new(id.clone(), 0, self.clock.now_ms());
                instance.lease();
                let leased = instance.clone();
                state.slots.insert(
                    id,
                    Tracked { instance, consecutive_failures: 0 },
                );
                return Ok(leased);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PoolError::PoolExhausted);
            }
            let remaining = deadline - now;
            let result = self.available.wait_for(&mut state, remaining);
            if result.timed_out() {
                continue;
            }
        }
    }

    /// Returns a previously leased instance to the pool, applying health
    /// policy based on the job outcome it just ran.
    pub fn release(&self, instance: Instance, outcome: ReleaseOutcome) {
        let mut state = self.state.lock();
        if let Some(tracked) = state.slots.get_mut(&instance.id) {
            tracked.instance.release();
            tracked.instance.pid = instance.pid;

            if outcome.is_unhealthy_signal() {
                tracked.consecutive_failures += 1;
            } else {
                tracked.consecutive_failures = 0;
            }

            let limit_exceeded = tracked.instance.files_processed >= state.instance_file_limit as u64;
            if tracked.consecutive_failures >= CONSECUTIVE_FAILURE_LIMIT || limit_exceeded {
                tracked.instance.mark_unhealthy();
            }
        }
        drop(state);
        self.available.notify_one();
    }

    /// Drops unhealthy/terminated instances (health check runs on every
    /// lease attempt), then shrinks or grows the capacity bound.
    pub fn resize(&self, new_n: usize) {
        let mut state = self.state.lock();
        state.max_size = new_n;
        self.reap_unhealthy(&mut state);
        while state.slots.len() > new_n {
            if let Some(id) = state
                .slots
                .values()
                .find(|t| t.instance.is_available())
                .map(|t| t.instance.id.clone())
            {
                state.slots.remove(&id);
            } else {
                break;
            }
        }
        drop(state);
        self.available.notify_all();
    }

    /// Marks the pool as shutting down and terminates all tracked
    /// instances. In-flight leases are not force-released; callers are
    /// expected to have drained them first.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutting_down = true;
        for tracked in state.slots.values_mut() {
            tracked.instance.mark_terminated();
        }
        drop(state);
        self.available.notify_all();
    }

    pub fn size(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn idle_count(&self) -> usize {
        self.state
            .lock()
            .slots
            .values()
            .filter(|t| t.instance.is_available())
            .count()
    }

    fn reap_unhealthy(&self, state: &mut PoolState) {
        state
            .slots
            .retain(|_, t| t.instance.state != InstanceState::Unhealthy);
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
