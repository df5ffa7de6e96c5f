// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch coordinator: enumerates an input directory, dispatches one Job per
//! file across a fixed pool of worker threads, and drives each job through
//! lease -> invoke -> parse -> write -> state -> release -> progress.
//!
//! The coordinator is the sole owner of the job queue; no other component
//! reaches into it. Concurrency follows the parallel-threads-plus-bounded-
//! queue model: a worker thread holds exactly one instance for the
//! duration of its current job, including any of that job's retries, so a
//! job's backoff wait ties up its worker rather than a dedicated timer.
//!
//! The dispatch loop also owns daemon liveness: a daemon found unreachable
//! on consecutive checks gets one supervised restart attempt before the
//! whole batch is aborted with a daemon error.

use crate::pool::{InstancePool, PoolError, ReleaseOutcome};
use crate::progress::{ProgressBus, ProgressEvent};
use crate::retry::{RetryController, RetryDecision};
use crate::xml_parser;
use annorun_adapters::{DaemonError, DaemonSpec, DaemonSupervisor, Invoker};
use annorun_core::{Classify, Clock, Config, ErrorKind, IdGen, Job, JobId};
use annorun_storage::{has_completion_marker, output_path_for, write_concepts, StateError, StateManager};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("config error: {0}")]
    Config(String),
    #[error("daemon error: {0}")]
    Daemon(#[from] DaemonError),
    #[error("state persistence error: {0}")]
    State(#[from] StateError),
    #[error("failed to enumerate input directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Consecutive dispatch-loop checks a daemon must be unreachable for
/// before the coordinator treats it as persistent rather than a blip and
/// attempts a restart.
const DAEMON_UNREACHABLE_STREAK_BEFORE_RESTART: u32 = 2;

/// Aggregate counters returned once the batch finishes or is cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: u64,
    pub failed: u64,
    pub skipped_already_done: u64,
    pub cancelled: bool,
}

/// Cooperative cancellation handle: `process`/`resume` wires this to a
/// SIGINT handler; tests flip it directly.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Coordinator<I: Invoker + 'static, C: Clock, G: IdGen + 'static> {
    config: Arc<Config>,
    invoker: Arc<I>,
    pool: Arc<InstancePool<C, G>>,
    state: Arc<Mutex<StateManager<C>>>,
    retry: RetryController,
    progress: ProgressBus,
    clock: C,
    id_gen: G,
}

impl<I: Invoker + 'static, C: Clock, G: IdGen + 'static> Coordinator<I, C, G> {
    pub fn new(
        config: Arc<Config>,
        invoker: Arc<I>,
        pool: Arc<InstancePool<C, G>>,
        state: Arc<Mutex<StateManager<C>>>,
        clock: C,
        id_gen: G,
    ) -> Self {
        let retry = RetryController::new(config.max_attempts, config.retry_base, config.retry_cap);
        Self {
            config,
            invoker,
            pool,
            state,
            retry,
            progress: ProgressBus::new(),
            clock,
            id_gen,
        }
    }

    pub fn progress(&self) -> &ProgressBus {
        &self.progress
    }

    /// Enumerate `input_dir` for files matching `config.input_ext`, in
    /// deterministic lexicographic order, non-recursively.
    pub fn enumerate_input_files(&self, input_dir: &Path) -> Result<Vec<PathBuf>, CoordinatorError> {
        let want_ext = self.config.input_ext.trim_start_matches('.');
        let mut files: Vec<PathBuf> = std::fs::read_dir(input_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(want_ext))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Run a full batch over `input_dir`, writing CSVs and state into
    /// `output_dir`. Daemons named in `daemon_specs` are brought up first.
    pub fn run(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        daemon_specs: &[DaemonSpec],
        daemons: &mut DaemonSupervisor,
        cancel: &CancelToken,
    ) -> Result<RunSummary, CoordinatorError> {
        daemons.ensure_up(daemon_specs)?;

        let reset = self.state.lock().reset_in_progress_to_pending()?;
        if reset > 0 {
            info!(reset, "recovered in-progress rows from an unclean shutdown");
        }

        let files = self.enumerate_input_files(input_dir)?;
        let mut skipped = 0u64;
        let pending: Vec<PathBuf> = files
            .into_iter()
            .filter(|f| {
                if !self.state.lock().is_completed(f) {
                    return true;
                }
                if has_completion_marker(&output_path_for(output_dir, f)) {
                    skipped += 1;
                    return false;
                }
                warn!(file = %f.display(), "completed record has no completion marker on disk, demoting to pending");
                if let Err(e) = self.state.lock().demote_to_pending(f) {
                    error!(error = %e, file = %f.display(), "failed to persist demotion to pending");
                }
                true
            })
            .collect();

        self.progress.publish(ProgressEvent::BatchStarted { total_files: pending.len() as u64 });

        let queue_depth = self.config.queue_depth().max(1);
        let (tx, rx) = mpsc::sync_channel::<Job>(queue_depth);
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::new();
        for worker_id in 0..self.config.pool_size {
            let rx = Arc::clone(&rx);
            let invoker = Arc::clone(&self.invoker);
            let pool = Arc::clone(&self.pool);
            let state = Arc::clone(&self.state);
            let retry = self.retry;
            let progress = self.progress.clone();
            let clock = self.clock.clone();
            let id_gen = self.id_gen.clone();
            let cancel = cancel.clone();
            let config = Arc::clone(&self.config);
            let output_dir = output_dir.to_path_buf();

            handles.push(thread::spawn(move || {
                worker_loop(
                    worker_id, rx, invoker, pool, state, retry, progress, clock, id_gen, cancel,
                    config, output_dir,
                )
            }));
        }

        let mut unreachable_streak = 0u32;
        let mut daemon_abort = None;

        for path in pending {
            if cancel.is_cancelled() {
                break;
            }

            if let Some(down) = first_unreachable_daemon(daemons) {
                unreachable_streak += 1;
                warn!(daemon = %down, streak = unreachable_streak, "daemon unreachable during batch");
                if unreachable_streak >= DAEMON_UNREACHABLE_STREAK_BEFORE_RESTART {
                    info!(daemon = %down, "daemon persistently unreachable, attempting one supervised restart");
                    if let Err(e) = daemons.ensure_up(daemon_specs) {
                        error!(error = %e, "daemon restart failed, aborting batch");
                        daemon_abort = Some(e);
                        cancel.cancel();
                        break;
                    }
                    unreachable_streak = 0;
                }
            } else {
                unreachable_streak = 0;
            }

            let id = JobId::new(self.id_gen.next());
            let job = Job::first_attempt(id, path);
            if tx.send(job).is_err() {
                break;
            }
        }
        drop(tx);

        for h in handles {
            let _ = h.join();
        }

        self.pool.shutdown();
        daemons.shutdown();

        if let Some(e) = daemon_abort {
            return Err(CoordinatorError::Daemon(e));
        }

        let manifest = self.state.lock().manifest().clone();
        let summary = RunSummary {
            completed: manifest.counters.completed,
            failed: manifest.counters.failed,
            skipped_already_done: skipped,
            cancelled: cancel.is_cancelled(),
        };

        if summary.cancelled {
            self.progress.publish(ProgressEvent::BatchCancelled {
                completed: summary.completed,
                failed: summary.failed,
                outstanding: manifest.outstanding(),
            });
        } else {
            self.progress.publish(ProgressEvent::BatchCompleted {
                completed: summary.completed,
                failed: summary.failed,
            });
        }

        Ok(summary)
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop<I: Invoker, C: Clock, G: IdGen>(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    invoker: Arc<I>,
    pool: Arc<InstancePool<C, G>>,
    state: Arc<Mutex<StateManager<C>>>,
    retry: RetryController,
    progress: ProgressBus,
    clock: C,
    id_gen: G,
    cancel: CancelToken,
    config: Arc<Config>,
    output_dir: PathBuf,
) {
    loop {
        let job = {
            let guard = rx.lock();
            guard.recv()
        };
        let Ok(mut job) = job else { break };

        progress.publish(ProgressEvent::JobStarted { file: job.file_path.clone() });

        loop {
            if cancel.is_cancelled() {
                warn!(worker_id, file = %job.file_path.display(), "cancellation requested, leaving job pending");
                break;
            }

            let instance = match pool.lease(config.per_file_timeout) {
                Ok(instance) => instance,
                Err(PoolError::ShuttingDown) => break,
                Err(PoolError::PoolExhausted) => {
                    match retry.decide(job.attempt, ErrorKind::PoolExhausted) {
                        RetryDecision::GiveUp => {
                            finalize_failure(&state, &progress, &job, ErrorKind::PoolExhausted, "pool exhausted");
                            break;
                        }
                        RetryDecision::RetryAfter(after) => {
                            progress.publish(ProgressEvent::JobRetried {
                                file: job.file_path.clone(),
                                attempt: job.attempt,
                                after,
                            });
                            clock.sleep(after);
                            job = job.retry_of(JobId::new(id_gen.next()));
                            continue;
                        }
                    }
                }
            };

            if let Err(e) = state.lock().mark_in_progress(&job.file_path) {
                error!(error = %e, "failed to persist in_progress state, aborting batch");
                pool.release(instance, ReleaseOutcome::failure(None, false));
                break;
            }

            let outcome = run_one_attempt(&invoker, &job, &instance.id.to_string(), config.per_file_timeout, &output_dir);

            match outcome {
                Ok((concepts_count, seconds)) => {
                    pool.release(instance, ReleaseOutcome::success());
                    let now = clock.now_ms();
                    job.complete(0, now);
                    if let Err(e) = state.lock().mark_completed(&job.file_path, concepts_count, seconds) {
                        error!(error = %e, "failed to persist completed state");
                    }
                    progress.publish(ProgressEvent::JobCompleted {
                        file: job.file_path.clone(),
                        concepts: concepts_count,
                        seconds,
                    });
                    break;
                }
                Err((kind, message, signaled)) => {
                    pool.release(instance, ReleaseOutcome::failure(None, signaled));
                    match retry.decide(job.attempt, kind) {
                        RetryDecision::GiveUp => {
                            finalize_failure(&state, &progress, &job, kind, &message);
                            break;
                        }
                        RetryDecision::RetryAfter(after) => {
                            progress.publish(ProgressEvent::JobRetried {
                                file: job.file_path.clone(),
                                attempt: job.attempt,
                                after,
                            });
                            clock.sleep(after);
                            job = job.retry_of(JobId::new(id_gen.next()));
                        }
                    }
                }
            }
        }
    }
}

/// The name of the first supervised daemon that failed its liveness probe,
/// if any.
fn first_unreachable_daemon(daemons: &DaemonSupervisor) -> Option<String> {
    daemons.status().into_iter().find(|(_, status)| !status.reachable).map(|(name, _)| name)
}

fn finalize_failure<C: Clock>(
    state: &Arc<Mutex<StateManager<C>>>,
    progress: &ProgressBus,
    job: &Job,
    kind: ErrorKind,
    message: &str,
) {
    if let Err(e) = state.lock().mark_failed(&job.file_path, message.to_string(), kind) {
        error!(error = %e, "failed to persist failed state");
    }
    progress.publish(ProgressEvent::JobFailed {
        file: job.file_path.clone(),
        kind,
        error: message.to_string(),
    });
}

/// One lease's worth of work: read the input, invoke the annotator, parse
/// its output, and write the CSV. Returns `(concepts_count, wall_seconds)`
/// on success, or `(kind, message, was_signaled)` on failure.
fn run_one_attempt<I: Invoker>(
    invoker: &I,
    job: &Job,
    job_key: &str,
    timeout: std::time::Duration,
    output_dir: &Path,
) -> Result<(u64, f64), (ErrorKind, String, bool)> {
    let input_text = std::fs::read_to_string(&job.file_path)
        .map_err(|e| (ErrorKind::Io, e.to_string(), false))?;

    let result = invoker
        .invoke(&input_text, job_key, timeout)
        .map_err(|e| (e.classify(), e.to_string(), matches!(e, annorun_adapters::InvokeError::Signaled)))?;

    let xml = std::fs::read_to_string(&result.stdout_xml_path)
        .map_err(|e| (ErrorKind::Io, e.to_string(), false))?;

    let concepts = xml_parser::parse(&xml).map_err(|e| (e.classify(), e.to_string(), false))?;

    let csv_path = output_path_for(output_dir, &job.file_path);
    write_concepts(&csv_path, &concepts).map_err(|e| (e.classify(), e.to_string(), false))?;

    Ok((concepts.len() as u64, result.wall_seconds))
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
