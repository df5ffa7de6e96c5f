// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring shared by `process`, `resume`, and `retry`: building the engine
//! stack from a resolved `Config` and running one batch to completion.

use crate::exit_error::{exit_error, EXIT_CONFIG_ERROR, EXIT_DAEMON_FAILURE};
use crate::table::{Column, Table};
use annorun_adapters::{DaemonKind, DaemonSpec, DaemonSupervisor, ProcessInvoker};
use annorun_core::config::{DEFAULT_DAEMON_PROBE_ATTEMPTS, DEFAULT_DAEMON_PROBE_INTERVAL, DEFAULT_KILL_GRACE};
use annorun_core::{Clock, Config, RunManifest, SystemClock, UuidIdGen};
use annorun_engine::{check_fd_budget, CancelToken, Coordinator, CoordinatorError, InstancePool, RunSummary};
use annorun_storage::{StateError, StateManager};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

/// Number of recently-failed files printed to stderr when a batch finishes
/// with failures, per the "last ten failed-file summaries" user-visible
/// failure behavior.
const FAILED_SUMMARY_LIMIT: usize = 10;

/// Count files in `input_dir` matching `ext`, non-recursively. Mirrors the
/// coordinator's own enumeration, duplicated here only so a fresh
/// `RunManifest`'s `total_files` can be known before the coordinator (which
/// needs the state manager already built) exists.
pub fn count_input_files(input_dir: &Path, ext: &str) -> std::io::Result<u64> {
    let want_ext = ext.trim_start_matches('.');
    let count = std::fs::read_dir(input_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(want_ext))
        .count();
    Ok(count as u64)
}

/// Open (or create) the state file at `output_dir/.state.json`. The passed
/// manifest only takes effect if no state file exists yet; an existing
/// file's manifest (including its original `input_dir`) wins.
pub fn open_state(
    output_dir: &Path,
    run_id: &str,
    config: &Config,
    input_dir: &Path,
    total_files: u64,
) -> Result<Arc<Mutex<StateManager<SystemClock>>>, StateError> {
    let clock = SystemClock;
    let manifest = RunManifest::new(
        run_id.to_string(),
        clock.now_ms(),
        config.pool_size,
        config.annotator_bin.clone(),
        config.ports.tagger,
        config.ports.wsd,
        total_files,
        input_dir.to_path_buf(),
    );
    let state_path = output_dir.join(".state.json");
    let manager = StateManager::open(&state_path, manifest, clock)?;
    Ok(Arc::new(Mutex::new(manager)))
}

fn daemon_specs(config: &Config) -> Vec<DaemonSpec> {
    let tagger_bin = std::env::var_os("ANNORUN_TAGGER_BIN")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tagger"));
    let wsd_bin = std::env::var_os("ANNORUN_WSD_BIN")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("wsd"));

    vec![
        DaemonSpec {
            kind: DaemonKind::Tagger,
            command: tagger_bin,
            args: vec![config.ports.tagger.to_string()],
            port: config.ports.tagger,
        },
        DaemonSpec {
            kind: DaemonKind::Wsd,
            command: wsd_bin,
            args: vec![config.ports.wsd.to_string()],
            port: config.ports.wsd,
        },
    ]
}

/// Drive one full batch: bring up daemons, run the coordinator to
/// completion or cancellation, print progress as it happens, and return the
/// final summary.
pub fn run_batch(
    config: Arc<Config>,
    input_dir: PathBuf,
    output_dir: PathBuf,
    state: Arc<Mutex<StateManager<SystemClock>>>,
) -> anyhow::Result<RunSummary> {
    check_fd_budget(config.pool_size).map_err(|e| exit_error(EXIT_CONFIG_ERROR, e.to_string()))?;

    let clock = SystemClock;
    let id_gen = UuidIdGen;
    let pool = Arc::new(InstancePool::new(config.pool_size, config.instance_file_limit, clock, id_gen.clone()));

    let temp_dir = output_dir.join(".tmp");
    let diagnostics_dir = output_dir.join("diagnostics");
    let invoker = Arc::new(ProcessInvoker::new(
        config.annotator_bin.clone(),
        config.annotator_options.clone(),
        temp_dir,
        diagnostics_dir,
        DEFAULT_KILL_GRACE,
    ));

    let coordinator = Coordinator::new(Arc::clone(&config), invoker, pool, state, clock, id_gen);

    let (stop, printer) = spawn_progress_printer(coordinator.progress());

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            cancel.cancel();
        })?;
    }

    let specs = daemon_specs(&config);
    let mut daemons = DaemonSupervisor::new(&output_dir, DEFAULT_DAEMON_PROBE_ATTEMPTS, DEFAULT_DAEMON_PROBE_INTERVAL);

    info!(input = %input_dir.display(), output = %output_dir.display(), pool_size = config.pool_size, "running batch");
    let result = coordinator.run(&input_dir, &output_dir, &specs, &mut daemons, &cancel);

    stop.store(true, Ordering::Relaxed);
    let _ = printer.join();

    result.map_err(|e| match &e {
        CoordinatorError::Daemon(_) => exit_error(EXIT_DAEMON_FAILURE, e.to_string()),
        _ => exit_error(EXIT_CONFIG_ERROR, e.to_string()),
    })
}

fn spawn_progress_printer(bus: &annorun_engine::ProgressBus) -> (Arc<AtomicBool>, thread::JoinHandle<()>) {
    let subscriber = bus.subscribe();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_thread = Arc::clone(&stop);

    let handle = thread::spawn(move || loop {
        for event in subscriber.drain() {
            print_event(&event);
        }
        if stop_for_thread.load(Ordering::Relaxed) {
            for event in subscriber.drain() {
                print_event(&event);
            }
            break;
        }
        thread::sleep(Duration::from_millis(200));
    });

    (stop, handle)
}

fn print_event(event: &annorun_engine::ProgressEvent) {
    use annorun_engine::ProgressEvent::*;
    match event {
        BatchStarted { total_files } => eprintln!("batch started: {total_files} files"),
        JobStarted { file } => eprintln!("  processing {}", file.display()),
        JobCompleted { file, concepts, seconds } => {
            eprintln!("  done {} ({concepts} concepts, {seconds:.1}s)", file.display())
        }
        JobRetried { file, attempt, after } => {
            eprintln!("  retry {} (attempt {attempt}, backing off {after:?})", file.display())
        }
        JobFailed { file, kind, error } => {
            eprintln!("  failed {} [{kind:?}]: {error}", file.display())
        }
        BatchCompleted { completed, failed } => {
            eprintln!("batch finished: {completed} completed, {failed} failed")
        }
        BatchCancelled { completed, failed, outstanding } => {
            eprintln!("batch interrupted: {completed} completed, {failed} failed, {outstanding} outstanding")
        }
    }
}

pub fn print_summary(summary: &RunSummary) {
    let mut table = Table::new(vec![Column::left("METRIC"), Column::right("COUNT")]);
    table.row(vec!["completed".to_string(), summary.completed.to_string()]);
    table.row(vec!["failed".to_string(), summary.failed.to_string()]);
    table.row(vec!["skipped (already done)".to_string(), summary.skipped_already_done.to_string()]);
    table.row(vec!["cancelled".to_string(), summary.cancelled.to_string()]);
    let _ = table.render(&mut std::io::stdout());
}

/// Print up to the last `FAILED_SUMMARY_LIMIT` failed files, per the
/// user-visible failure behavior described for non-zero batch exits.
pub fn print_recent_failures(state: &StateManager<SystemClock>) {
    let mut failed = state.failed_records();
    failed.sort_by(|a, b| a.0.cmp(&b.0));
    for (path, record) in failed.iter().rev().take(FAILED_SUMMARY_LIMIT) {
        let kind = record.last_error_kind.map(|k| format!("{k:?}")).unwrap_or_else(|| "unknown".to_string());
        let error = record.last_error.as_deref().unwrap_or("");
        eprintln!("failed: {path} [{kind}] {error}");
    }
}
