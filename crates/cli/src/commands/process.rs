// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `process <in> <out>`: run a fresh or resumed batch.

use crate::commands::support;
use crate::exit_error::{exit_error, EXIT_CONFIG_ERROR, EXIT_INTERRUPTED, EXIT_OK};
use crate::{logging, ExitCode};
use annorun_core::config::{CliOverrides, EnvOverrides};
use annorun_core::Config;
use annorun_core::{IdGen, UuidIdGen};
use annorun_engine::detect_system_resources;
use annorun_storage::OutputRootLock;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, clap::Args)]
pub struct ProcessArgs {
    /// Directory of input text files.
    pub input: PathBuf,
    /// Directory CSVs, state, and logs are written into.
    pub output: PathBuf,

    #[arg(long)]
    pub annotator_bin: Option<PathBuf>,
    #[arg(long)]
    pub annotator_options: Option<String>,
    #[arg(long)]
    pub pool_size: Option<usize>,
    #[arg(long)]
    pub per_file_timeout_sec: Option<u64>,
    #[arg(long)]
    pub max_attempts: Option<u32>,
    #[arg(long)]
    pub retry_base_sec: Option<u64>,
    #[arg(long)]
    pub retry_cap_sec: Option<u64>,
    #[arg(long)]
    pub input_ext: Option<String>,

    /// Launch the batch as a detached child process and return immediately.
    #[arg(long)]
    pub background: bool,
}

fn cli_overrides(args: &ProcessArgs) -> CliOverrides {
    CliOverrides {
        annotator_bin: args.annotator_bin.clone(),
        annotator_options: args.annotator_options.clone(),
        pool_size: args.pool_size,
        per_file_timeout_sec: args.per_file_timeout_sec,
        max_attempts: args.max_attempts,
        retry_base_sec: args.retry_base_sec,
        retry_cap_sec: args.retry_cap_sec,
        input_ext: args.input_ext.clone(),
    }
}

pub fn run(args: ProcessArgs) -> anyhow::Result<ExitCode> {
    if args.background {
        return spawn_background(&args);
    }

    let cli = cli_overrides(&args);
    let env = EnvOverrides::from_env();
    let resources = detect_system_resources();
    let config = Config::resolve(&env, &cli, resources.logical_cpus, resources.available_memory_gb)
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;

    let _lock = OutputRootLock::acquire(&args.output, config.lock_stale_age)
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;

    let run_id = UuidIdGen.next();
    let _log_guard = logging::init(&run_id, &args.output)?;
    info!(run_id = %run_id, input = %args.input.display(), output = %args.output.display(), "starting batch");

    let total_files = support::count_input_files(&args.input, &config.input_ext)
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, format!("cannot read input directory: {e}")))?;
    let state = support::open_state(&args.output, &run_id, &config, &args.input, total_files)
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;

    let config = Arc::new(config);
    let summary = support::run_batch(Arc::clone(&config), args.input.clone(), args.output.clone(), Arc::clone(&state))?;

    support::print_summary(&summary);
    if summary.failed > 0 {
        support::print_recent_failures(&state.lock());
    }

    if summary.cancelled {
        return Ok(EXIT_INTERRUPTED);
    }
    Ok(EXIT_OK)
}

/// Re-exec this binary as `process` without `--background`, detached, and
/// return immediately.
fn spawn_background(args: &ProcessArgs) -> anyhow::Result<ExitCode> {
    let exe = std::env::current_exe()?;
    let mut cmd = Command::new(exe);
    cmd.arg("process").arg(&args.input).arg(&args.output);

    if let Some(v) = &args.annotator_bin {
        cmd.arg("--annotator-bin").arg(v);
    }
    if let Some(v) = &args.annotator_options {
        cmd.arg("--annotator-options").arg(v);
    }
    if let Some(v) = args.pool_size {
        cmd.arg("--pool-size").arg(v.to_string());
    }
    if let Some(v) = args.per_file_timeout_sec {
        cmd.arg("--per-file-timeout-sec").arg(v.to_string());
    }
    if let Some(v) = args.max_attempts {
        cmd.arg("--max-attempts").arg(v.to_string());
    }
    if let Some(v) = args.retry_base_sec {
        cmd.arg("--retry-base-sec").arg(v.to_string());
    }
    if let Some(v) = args.retry_cap_sec {
        cmd.arg("--retry-cap-sec").arg(v.to_string());
    }
    if let Some(v) = &args.input_ext {
        cmd.arg("--input-ext").arg(v);
    }

    cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
    let child = cmd.spawn()?;
    println!("started in background, pid {}", child.id());
    Ok(EXIT_OK)
}
