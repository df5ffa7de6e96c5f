// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervises the two external network daemons (tagger, word-sense
//! disambiguation) the annotator depends on.
//!
//! `ensure_up()` is idempotent: if a daemon's port already accepts
//! connections when called, the supervisor assumes external ownership and
//! does not spawn a duplicate. PIDs of daemons it did start are recorded in
//! a sidecar file under the output root, so a later run can adopt or kill
//! stale processes; on shutdown it never terminates a process it did not
//! start.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to start {name}: {source}")]
    StartFailed {
        name: &'static str,
        source: std::io::Error,
    },
    #[error("{name} did not become reachable on port {port} after probe budget exhausted")]
    Unreachable { name: &'static str, port: u16 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonKind {
    Tagger,
    Wsd,
}

impl DaemonKind {
    fn name(self) -> &'static str {
        match self {
            DaemonKind::Tagger => "tagger",
            DaemonKind::Wsd => "wsd",
        }
    }
}

/// One daemon's launch command and the port it should be reachable on.
#[derive(Debug, Clone)]
pub struct DaemonSpec {
    pub kind: DaemonKind,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub port: u16,
}

/// Whether the supervisor spawned a given daemon (and therefore owns
/// killing it) or found it already running (external ownership).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Ownership {
    Owned,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SidecarEntry {
    name: String,
    pid: Option<u32>,
    port: u16,
    ownership: Ownership,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    entries: Vec<SidecarEntry>,
}

/// Liveness of one supervised daemon, as reported by `status()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonStatus {
    pub reachable: bool,
    pub owned: bool,
}

pub struct DaemonSupervisor {
    sidecar_path: PathBuf,
    probe_attempts: u32,
    probe_interval: Duration,
    sidecar: Sidecar,
}

impl DaemonSupervisor {
    pub fn new(output_root: &Path, probe_attempts: u32, probe_interval: Duration) -> Self {
        let sidecar_path = output_root.join(".daemon-pids.json");
        let sidecar = Self::load_sidecar(&sidecar_path).unwrap_or_default();
        Self {
            sidecar_path,
            probe_attempts,
            probe_interval,
            sidecar,
        }
    }

    fn load_sidecar(path: &Path) -> Option<Sidecar> {
        let contents = fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn save_sidecar(&self) -> Result<(), DaemonError> {
        if let Some(parent) = self.sidecar_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.sidecar).unwrap_or_default();
        fs::write(&self.sidecar_path, json)?;
        Ok(())
    }

    /// Idempotently start both daemons, returning once both accept
    /// connections.
    pub fn ensure_up(&mut self, specs: &[DaemonSpec]) -> Result<(), DaemonError> {
        for spec in specs {
            self.ensure_one_up(spec)?;
        }
        self.save_sidecar()
    }

    fn ensure_one_up(&mut self, spec: &DaemonSpec) -> Result<(), DaemonError> {
        let name = spec.kind.name();
        if probe_once(spec.port) {
            info!(daemon = name, port = spec.port, "daemon already reachable, adopting");
            self.sidecar.entries.push(SidecarEntry {
                name: name.to_string(),
                pid: None,
                port: spec.port,
                ownership: Ownership::External,
            });
            return Ok(());
        }

        let child = Command::new(&spec.command)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| DaemonError::StartFailed { name, source })?;
        let pid = child.id();

        self.sidecar.entries.push(SidecarEntry {
            name: name.to_string(),
            pid: Some(pid),
            port: spec.port,
            ownership: Ownership::Owned,
        });

        for _ in 0..self.probe_attempts {
            if probe_once(spec.port) {
                info!(daemon = name, port = spec.port, pid, "daemon became reachable");
                return Ok(());
            }
            std::thread::sleep(self.probe_interval);
        }

        Err(DaemonError::Unreachable {
            name,
            port: spec.port,
        })
    }

    /// Terminate every daemon this supervisor started; never touches
    /// entries recorded with external ownership.
    pub fn shutdown(&mut self) {
        for entry in &self.sidecar.entries {
            if entry.ownership != Ownership::Owned {
                continue;
            }
            let Some(pid) = entry.pid else { continue };
            if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                warn!(daemon = %entry.name, pid, error = %e, "failed to signal daemon");
            }
        }
        self.sidecar.entries.clear();
        let _ = self.save_sidecar();
    }

    /// Current liveness of each supervised daemon.
    pub fn status(&self) -> Vec<(String, DaemonStatus)> {
        self.sidecar
            .entries
            .iter()
            .map(|e| {
                (
                    e.name.clone(),
                    DaemonStatus {
                        reachable: probe_once(e.port),
                        owned: e.ownership == Ownership::Owned,
                    },
                )
            })
            .collect()
    }
}

fn probe_once(port: u16) -> bool {
    let addr = format!("127.0.0.1:{port}");
    match addr.to_socket_addrs() {
        Ok(mut addrs) => addrs
            .next()
            .map(|a| TcpStream::connect_timeout(&a, Duration::from_millis(500)).is_ok())
            .unwrap_or(false),
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "daemon_supervisor_tests.rs"]
mod tests;
