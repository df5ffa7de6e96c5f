// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single-process publish/subscribe channel for batch progress events.
//!
//! Not a reporting or visualization surface: just the fan-out primitive a
//! CLI progress line and a final summary table subscribe to. Delivery is
//! at-least-once per subscriber; a subscriber that falls behind drops its
//! oldest events rather than blocking the publisher.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use annorun_core::ErrorKind;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    BatchStarted { total_files: u64 },
    JobStarted { file: PathBuf },
    JobCompleted { file: PathBuf, concepts: u64, seconds: f64 },
    JobFailed { file: PathBuf, kind: ErrorKind, error: String },
    JobRetried { file: PathBuf, attempt: u32, after: std::time::Duration },
    BatchCompleted { completed: u64, failed: u64 },
    BatchCancelled { completed: u64, failed: u64, outstanding: u64 },
}

/// Capacity of each subscriber's ring buffer. Chosen generously relative
/// to typical batch sizes; a subscriber that can't drain this many events
/// between polls is not going to catch up anyway.
const DEFAULT_RING_CAPACITY: usize = 1024;

struct Subscription {
    id: u64,
    buffer: VecDeque<ProgressEvent>,
    capacity: usize,
}

struct BusState {
    subscriptions: Vec<Subscription>,
}

/// Publisher handle shared by dispatcher threads.
#[derive(Clone)]
pub struct ProgressBus {
    state: Arc<Mutex<BusState>>,
    next_id: Arc<AtomicU64>,
}

/// A registered subscriber's read handle. Dropping it unregisters it.
pub struct Subscriber {
    id: u64,
    state: Arc<Mutex<BusState>>,
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState { subscriptions: Vec::new() })),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a new subscriber with the default ring capacity.
    pub fn subscribe(&self) -> Subscriber {
        self.subscribe_with_capacity(DEFAULT_RING_CAPACITY)
    }

    pub fn subscribe_with_capacity(&self, capacity: usize) -> Subscriber {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.state.lock().subscriptions.push(Subscription {
            id,
            buffer: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        });
        Subscriber { id, state: Arc::clone(&self.state) }
    }

    /// Publish an event to every live subscriber. Never blocks on a slow
    /// subscriber: a full ring drops its oldest entry to make room.
    pub fn publish(&self, event: ProgressEvent) {
        let mut state = self.state.lock();
        for sub in state.subscriptions.iter_mut() {
            if sub.buffer.len() >= sub.capacity {
                sub.buffer.pop_front();
            }
            sub.buffer.push_back(event.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }
}

impl Subscriber {
    /// Drain every event currently buffered for this subscriber, oldest
    /// first, without blocking.
    pub fn drain(&self) -> Vec<ProgressEvent> {
        let mut state = self.state.lock();
        if let Some(sub) = state.subscriptions.iter_mut().find(|s| s.id == self.id) {
            sub.buffer.drain(..).collect()
        } else {
            Vec::new()
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.subscriptions.retain(|s| s.id != self.id);
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
