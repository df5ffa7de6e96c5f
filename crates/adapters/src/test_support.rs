// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fakes for other crates' tests, so engine and CLI tests never
//! need a real annotator binary or real network daemons.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::invoker::{InvocationResult, InvokeError, Invoker};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Scripted response for one job key, or a default applied to all others.
#[derive(Clone)]
pub enum FakeOutcome {
    Success { xml: String, wall_seconds: f64 },
    Fail(fn() -> InvokeError),
}

/// A fake [`Invoker`] that returns scripted outcomes instead of spawning a
/// real annotator process.
pub struct FakeInvoker {
    by_key: Mutex<HashMap<String, FakeOutcome>>,
    default: FakeOutcome,
    temp_dir: PathBuf,
    calls: Mutex<Vec<String>>,
}

impl FakeInvoker {
    pub fn new(temp_dir: PathBuf) -> Self {
        Self {
            by_key: Mutex::new(HashMap::new()),
            default: FakeOutcome::Success {
                xml: "<taggedDocument/>".to_string(),
                wall_seconds: 0.01,
            },
            temp_dir,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_outcome(self, job_key: &str, outcome: FakeOutcome) -> Self {
        self.by_key.lock().insert(job_key.to_string(), outcome);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl Invoker for FakeInvoker {
    fn invoke(
        &self,
        _input_text: &str,
        job_key: &str,
        _timeout: Duration,
    ) -> Result<InvocationResult, InvokeError> {
        self.calls.lock().push(job_key.to_string());
        let outcome = self
            .by_key
            .lock()
            .get(job_key)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        match outcome {
            FakeOutcome::Success { xml, wall_seconds } => {
                let path = self.temp_dir.join(format!("{job_key}.xml"));
                std::fs::create_dir_all(&self.temp_dir).ok();
                std::fs::write(&path, xml).map_err(InvokeError::Io)?;
                Ok(InvocationResult {
                    exit_code: 0,
                    stdout_xml_path: path,
                    stderr_text: String::new(),
                    wall_seconds,
                })
            }
            FakeOutcome::Fail(make_err) => Err(make_err()),
        }
    }
}
