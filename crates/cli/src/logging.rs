// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sets up `tracing` with a non-blocking, append-only file writer under
//! `<output_root>/logs/run-<run_id>.log`, exactly the file named in the
//! output layout. The returned guard must be held for the process lifetime;
//! dropping it early truncates buffered log lines.

use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub fn init(run_id: &str, output_root: &Path) -> anyhow::Result<WorkerGuard> {
    let log_dir = output_root.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("run-{run_id}.log"));
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_from_env("ANNORUN_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(guard)
}
