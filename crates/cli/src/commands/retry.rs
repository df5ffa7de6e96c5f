// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `retry <out>`: re-enqueue failed `FileRecord`s with a reset attempt
//! count, then run the batch again over just-requeued and still-pending
//! files.

use crate::commands::support;
use crate::exit_error::{exit_error, EXIT_CONFIG_ERROR, EXIT_INTERRUPTED, EXIT_OK};
use crate::{logging, ExitCode};
use annorun_core::config::{CliOverrides, EnvOverrides};
use annorun_core::{Config, RunManifest, SystemClock};
use annorun_engine::detect_system_resources;
use annorun_storage::{OutputRootLock, StateManager};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, clap::Args)]
pub struct RetryArgs {
    /// Output root of the batch whose failed files should be retried.
    pub output: PathBuf,

    #[arg(long)]
    pub per_file_timeout_sec: Option<u64>,
}

pub fn run(args: RetryArgs) -> anyhow::Result<ExitCode> {
    let state_path = args.output.join(".state.json");
    if !state_path.exists() {
        return Err(exit_error(EXIT_CONFIG_ERROR, format!("no state found at {}", args.output.display())));
    }

    let cli = CliOverrides {
        per_file_timeout_sec: args.per_file_timeout_sec,
        ..Default::default()
    };
    let env = EnvOverrides::from_env();
    let resources = detect_system_resources();
    let config = Config::resolve(&env, &cli, resources.logical_cpus, resources.available_memory_gb)
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;

    let _lock = OutputRootLock::acquire(&args.output, config.lock_stale_age)
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;

    let placeholder = RunManifest::new(
        "unused".to_string(),
        0,
        config.pool_size,
        config.annotator_bin.clone(),
        config.ports.tagger,
        config.ports.wsd,
        0,
        PathBuf::new(),
    );
    let mut manager = StateManager::open(&state_path, placeholder, SystemClock)
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;
    let requeued = manager
        .requeue_all_failed()
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;
    let input_dir = manager.manifest().input_dir.clone();
    let run_id = manager.manifest().run_id.clone();

    let _log_guard = logging::init(&run_id, &args.output)?;
    info!(run_id = %run_id, requeued = requeued.len(), "retrying failed files");

    if requeued.is_empty() {
        println!("no failed files to retry");
        return Ok(EXIT_OK);
    }

    let state = Arc::new(parking_lot::Mutex::new(manager));
    let config = Arc::new(config);
    let summary = support::run_batch(Arc::clone(&config), input_dir, args.output.clone(), Arc::clone(&state))?;

    support::print_summary(&summary);
    if summary.failed > 0 {
        support::print_recent_failures(&state.lock());
    }

    if summary.cancelled {
        return Ok(EXIT_INTERRUPTED);
    }
    Ok(EXIT_OK)
}
