// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `resume <out>`: continue a batch whose state lives at `<out>`, recovering
//! the original input directory from the persisted `RunManifest`.

use crate::commands::support;
use crate::exit_error::{exit_error, EXIT_CONFIG_ERROR, EXIT_INTERRUPTED, EXIT_OK};
use crate::{logging, ExitCode};
use annorun_core::config::{CliOverrides, EnvOverrides};
use annorun_core::Config;
use annorun_engine::detect_system_resources;
use annorun_storage::{OutputRootLock, StateManager};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, clap::Args)]
pub struct ResumeArgs {
    /// Output root of the batch to resume.
    pub output: PathBuf,

    #[arg(long)]
    pub pool_size: Option<usize>,
    #[arg(long)]
    pub per_file_timeout_sec: Option<u64>,
}

pub fn run(args: ResumeArgs) -> anyhow::Result<ExitCode> {
    let state_path = args.output.join(".state.json");
    if !state_path.exists() {
        return Err(exit_error(EXIT_CONFIG_ERROR, format!("no state found at {}", args.output.display())));
    }

    let cli = CliOverrides {
        pool_size: args.pool_size,
        per_file_timeout_sec: args.per_file_timeout_sec,
        ..Default::default()
    };
    let env = EnvOverrides::from_env();
    let resources = detect_system_resources();
    let config = Config::resolve(&env, &cli, resources.logical_cpus, resources.available_memory_gb)
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;

    let _lock = OutputRootLock::acquire(&args.output, config.lock_stale_age)
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;

    let clock = annorun_core::SystemClock;
    let placeholder = annorun_core::RunManifest::new(
        "unused".to_string(),
        0,
        config.pool_size,
        config.annotator_bin.clone(),
        config.ports.tagger,
        config.ports.wsd,
        0,
        PathBuf::new(),
    );
    let manager = StateManager::open(&state_path, placeholder, clock)
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;
    let input_dir = manager.manifest().input_dir.clone();
    let run_id = manager.manifest().run_id.clone();
    let state = Arc::new(parking_lot::Mutex::new(manager));

    let _log_guard = logging::init(&run_id, &args.output)?;
    info!(run_id = %run_id, input = %input_dir.display(), output = %args.output.display(), "resuming batch");

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
