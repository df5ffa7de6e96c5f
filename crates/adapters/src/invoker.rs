// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Annotator invoker: one call per file, blocking on the child process.
//!
//! Writes the input text to a unique temp file, spawns the annotator with
//! stdout captured to a temp XML file, and enforces the timeout with a
//! SIGTERM-then-SIGKILL grace period. Temp files are removed on success;
//! on failure they are retained under a diagnostics directory keyed by job
//! id for later inspection.

use annorun_core::{Classify, ErrorKind};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("annotator exceeded timeout of {0:?}")]
    Timeout(Duration),
    #[error("annotator exited with status {0}")]
    NonZeroExit(i32),
    #[error("annotator was killed by signal")]
    Signaled,
}

impl Classify for InvokeError {
    fn classify(&self) -> ErrorKind {
        match self {
            InvokeError::Timeout(_) => ErrorKind::Timeout,
            InvokeError::Io(_) => ErrorKind::Io,
            InvokeError::NonZeroExit(_) | InvokeError::Signaled => ErrorKind::Unknown,
        }
    }
}

/// Outcome of one successful invocation.
#[derive(Debug)]
pub struct InvocationResult {
    pub exit_code: i32,
    pub stdout_xml_path: PathBuf,
    pub stderr_text: String,
    pub wall_seconds: f64,
}

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Abstraction the pool/coordinator depend on, so a fake can stand in for
/// real subprocess invocation in tests (`test-support` feature).
pub trait Invoker: Send + Sync {
    fn invoke(
        &self,
        input_text: &str,
        job_key: &str,
        timeout: Duration,
    ) -> Result<InvocationResult, InvokeError>;
}

/// Invokes a real annotator binary as a child process.
pub struct ProcessInvoker {
    annotator_bin: PathBuf,
    options: String,
    temp_dir: PathBuf,
    diagnostics_dir: PathBuf,
    kill_grace: Duration,
}

impl ProcessInvoker {
    pub fn new(
        annotator_bin: PathBuf,
        options: String,
        temp_dir: PathBuf,
        diagnostics_dir: PathBuf,
        kill_grace: Duration,
    ) -> Self {
        Self {
            annotator_bin,
            options,
            temp_dir,
            diagnostics_dir,
            kill_grace,
        }
    }

    fn temp_paths(&self, job_key: &str) -> (PathBuf, PathBuf) {
        let n = TEMP_FILE_COUNTER.fetch_add(1, Ordering::SeqCst);
        let stem = format!("{job_key}-{n}");
        (
            self.temp_dir.join(format!("{stem}.in.txt")),
            self.temp_dir.join(format!("{stem}.out.xml")),
        )
    }

    fn retain_for_diagnostics(&self, job_key: &str, input_path: &Path, output_path: &Path) {
        let dir = self.diagnostics_dir.join(job_key);
        if fs::create_dir_all(&dir).is_err() {
            warn!(job_key, "failed to create diagnostics directory");
            return;
        }
        for (src, name) in [(input_path, "input.txt"), (output_path, "output.xml")] {
            if src.exists() {
                let _ = fs::rename(src, dir.join(name));
            }
        }
    }
}

impl Invoker for ProcessInvoker {
    fn invoke(
        &self,
        input_text: &str,
        job_key: &str,
        timeout: Duration,
    ) -> Result<InvocationResult, InvokeError> {
        fs::create_dir_all(&self.temp_dir)?;
        let (input_path, output_path) = self.temp_paths(job_key);

        {
            let mut input_file = File::create(&input_path)?;
            input_file.write_all(input_text.as_bytes())?;
            input_file.sync_all()?;
        }

        let stdout_file = File::create(&output_path)?;
        let mut argv: Vec<String> = self
            .options
            .split_whitespace()
            .map(str::to_string)
            .collect();
        argv.push(input_path.to_string_lossy().into_owned());

        debug!(job_key, bin = %self.annotator_bin.display(), ?argv, "spawning annotator");

        let start = Instant::now();
        let mut child = Command::new(&self.annotator_bin)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(stdout_file)
            .stderr(Stdio::piped())
            .spawn()?;

        let result = wait_with_timeout(&mut child, timeout, self.kill_grace);
        let wall_seconds = start.elapsed().as_secs_f64();

        match result {
            Ok(status) => {
                let stderr_text = read_stderr(&mut child);
                if status == 0 {
                    let _ = fs::remove_file(&input_path);
                    Ok(InvocationResult {
                        exit_code: status,
                        stdout_xml_path: output_path,
                        stderr_text,
                        wall_seconds,
                    })
                } else {
                    self.retain_for_diagnostics(job_key, &input_path, &output_path);
                    Err(InvokeError::NonZeroExit(status))
                }
            }
            Err(WaitOutcome::TimedOut) => {
                self.retain_for_diagnostics(job_key, &input_path, &output_path);
                Err(InvokeError::Timeout(timeout))
            }
            Err(WaitOutcome::Signaled) => {
                self.retain_for_diagnostics(job_key, &input_path, &output_path);
                Err(InvokeError::Signaled)
            }
        }
    }
}

enum WaitOutcome {
    TimedOut,
    Signaled,
}

/// Poll the child for completion, sending SIGTERM then SIGKILL if `timeout`
/// elapses, with `kill_grace` between the two signals.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    kill_grace: Duration,
) -> Result<i32, WaitOutcome> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(Some(status)) = child.try_wait() {
            return status.code().ok_or(WaitOutcome::Signaled);
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    let pid = Pid::from_raw(child.id() as i32);
    let _ = signal::kill(pid, Signal::SIGTERM);

    let grace_deadline = Instant::now() + kill_grace;
    while Instant::now() < grace_deadline {
        if let Ok(Some(_)) = child.try_wait() {
            return Err(WaitOutcome::TimedOut);
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    let _ = signal::kill(pid, Signal::SIGKILL);
    let _ = child.wait();
    Err(WaitOutcome::TimedOut)
}

fn read_stderr(child: &mut Child) -> String {
    use std::io::Read;
    let mut buf = String::new();
    if let Some(stderr) = child.stderr.as_mut() {
        let _ = stderr.read_to_string(&mut buf);
    }
    buf
}

#[cfg(test)]
#[path = "invoker_tests.rs"]
mod tests;
