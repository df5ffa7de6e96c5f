// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! annorun-storage: crash-safe persistence for run state and CSV output.

pub mod csv_writer;
pub mod lock;
pub mod state;

pub use csv_writer::{
    has_completion_marker, output_path_for, write_concepts, CsvWriteError, COMPLETION_MARKER,
    CSV_HEADER,
};
pub use lock::{LockError, OutputRootLock};
pub use state::{StateError, StateManager};
