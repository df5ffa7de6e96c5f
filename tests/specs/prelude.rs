//! Test helpers for black-box specifications.
//!
//! Spawns the real `annorun` binary against fake annotator/daemon scripts
//! under `fixtures/`, so these specs exercise the actual process-spawning,
//! locking, and state-persistence paths rather than calling library code
//! directly.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU16, Ordering};

/// Returns the path to a binary, checking llvm-cov target directory first.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn annorun_binary() -> PathBuf {
    binary_path("annorun")
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/specs/fixtures")
}

pub fn fake_annotator() -> PathBuf {
    fixtures_dir().join("fake_annotator.sh")
}

pub fn fake_daemon() -> PathBuf {
    fixtures_dir().join("fake_daemon.py")
}

/// Bind an ephemeral port and release it immediately. Good enough for
/// handing a free-at-the-time port to a fake daemon a moment later.
fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port").local_addr().unwrap().port()
}

static PORT_HINT: AtomicU16 = AtomicU16::new(0);

/// Two distinct free ports, used so concurrently-running specs never fight
/// over the same tagger/WSD port.
fn daemon_ports() -> (u16, u16) {
    let _ = PORT_HINT.fetch_add(1, Ordering::Relaxed);
    (free_port(), free_port())
}

/// A CLI invocation builder that always wires in the fake annotator/daemon
/// binaries and a pair of free ports, so callers only need to add the
/// command-specific args.
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        let (tagger_port, wsd_port) = daemon_ports();
        Self {
            args: Vec::new(),
            envs: vec![
                ("ANNORUN_ANNOTATOR_BIN".into(), fake_annotator().to_string_lossy().into_owned()),
                ("ANNORUN_TAGGER_BIN".into(), fake_daemon().to_string_lossy().into_owned()),
                ("ANNORUN_WSD_BIN".into(), fake_daemon().to_string_lossy().into_owned()),
                ("ANNORUN_TAGGER_PORT".into(), tagger_port.to_string()),
                ("ANNORUN_WSD_PORT".into(), wsd_port.to_string()),
            ],
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.envs.push((key.to_string(), value.into()));
        self
    }

    /// Clear an env var this builder would otherwise set (e.g. to test the
    /// "no annotator binary configured" error path).
    pub fn without_annotator_bin(mut self) -> Self {
        self.envs.retain(|(k, _)| k != "ANNORUN_ANNOTATOR_BIN");
        self
    }

    pub fn command(self) -> Command {
        let mut cmd = Command::new(annorun_binary());
        cmd.args(&self.args);
        cmd.env_remove("ANNORUN_ANNOTATOR_BIN");
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }
}

pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// A temporary input directory plus a separate output directory, ready for
/// a `process`/`resume`/`retry` invocation.
pub struct Batch {
    input_dir: tempfile::TempDir,
    output_dir: tempfile::TempDir,
}

impl Batch {
    pub fn new() -> Self {
        Self {
            input_dir: tempfile::tempdir().expect("tempdir"),
            output_dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn input_path(&self) -> &Path {
        self.input_dir.path()
    }

    pub fn output_path(&self) -> &Path {
        self.output_dir.path()
    }

    /// Write one `<name>.txt` input file with the given content.
    pub fn file(&self, name: &str, content: &str) -> &Self {
        std::fs::write(self.input_dir.path().join(name), content).expect("write input file");
        self
    }

    pub fn csv_path(&self, stem: &str) -> PathBuf {
        self.output_path().join(format!("{stem}.csv"))
    }

    pub fn state_path(&self) -> PathBuf {
        self.output_path().join(".state.json")
    }
}
