// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `status <out>` / `status <out> --failed-only`: print a summary of a
//! batch's persisted state without running anything.

use crate::exit_error::{exit_error, EXIT_CONFIG_ERROR, EXIT_OK};
use crate::table::{Column, Table};
use crate::ExitCode;
use annorun_core::{FileStatus, RunManifest, SystemClock};
use annorun_storage::StateManager;
use std::path::PathBuf;

#[derive(Debug, Clone, clap::Args)]
pub struct StatusArgs {
    /// Output root to inspect.
    pub output: PathBuf,

    /// List only failed files, with their recorded error.
    #[arg(long)]
    pub failed_only: bool,
}

pub fn run(args: StatusArgs) -> anyhow::Result<ExitCode> {
    let state_path = args.output.join(".state.json");
    if !state_path.exists() {
        return Err(exit_error(EXIT_CONFIG_ERROR, format!("no state found at {}", args.output.display())));
    }

    let placeholder = RunManifest::new("unused".to_string(), 0, 1, PathBuf::new(), 0, 0, 0, PathBuf::new());
    let manager = StateManager::open(&state_path, placeholder, SystemClock)
        .map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;

    if args.failed_only {
        print_failed(&manager);
    } else {
        print_overview(&manager);
    }

    Ok(EXIT_OK)
}

fn print_overview(manager: &StateManager<SystemClock>) {
    let manifest = manager.manifest();
    println!("run_id:    {}", manifest.run_id);
    println!("pool_size: {}", manifest.pool_size);
    println!("total:     {}", manifest.total_files);
    println!("completed: {}", manifest.counters.completed);
    println!("failed:    {}", manifest.counters.failed);
    println!("retried:   {}", manifest.counters.retried);
    println!("remaining: {}", manifest.outstanding());

    let mut table = Table::new(vec![Column::left("FILE"), Column::left("STATUS"), Column::right("ATTEMPTS")]);
    for (path, record) in manager.snapshot() {
        table.row(vec![path, record.status.as_str().to_string(), record.attempts.to_string()]);
    }
    println!();
    let _ = table.render(&mut std::io::stdout());
}

fn print_failed(manager: &StateManager<SystemClock>) {
    let mut table = Table::new(vec![Column::left("FILE"), Column::left("KIND"), Column::left("ERROR")]);
    for (path, record) in manager.snapshot() {
        if record.status != FileStatus::Failed {
            continue;
        }
        let kind = record.last_error_kind.map(|k| format!("{k:?}")).unwrap_or_default();
        let error = record.last_error.clone().unwrap_or_default();
        table.row(vec![path, kind, error]);
    }
    let _ = table.render(&mut std::io::stdout());
}
