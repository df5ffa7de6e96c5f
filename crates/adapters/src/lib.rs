// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! annorun-adapters: OS-process-lifecycle adapters — the annotator invoker
//! and the tagger/WSD daemon supervisor.

pub mod daemon_supervisor;
pub mod invoker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use daemon_supervisor::{
    DaemonError, DaemonKind, DaemonSpec, DaemonStatus, DaemonSupervisor,
};
pub use invoker::{InvocationResult, InvokeError, Invoker, ProcessInvoker};
