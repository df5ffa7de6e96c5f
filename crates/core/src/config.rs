// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single immutable configuration record threaded through every
//! component, per the "global configuration singleton" redesign guidance:
//! no component reaches for a static/global config; `Config` is constructed
//! once at process start and passed explicitly (or as a cheap `Arc` clone)
//! into the coordinator, pool, supervisor, and state manager.

use std::path::PathBuf;
use std::time::Duration;

/// Per-file timeout default, resolved in favor of the larger of the two
/// conflicting values seen in prior art: the annotator is documented as
/// taking "seconds to minutes" per document, and a 120s default risks
/// false-positive timeouts on legitimately slow documents.
pub const DEFAULT_PER_FILE_TIMEOUT_SEC: u64 = 300;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_SEC: u64 = 5;
pub const DEFAULT_RETRY_CAP_SEC: u64 = 60;
pub const DEFAULT_INPUT_EXT: &str = "txt";
pub const DEFAULT_INSTANCE_FILE_LIMIT: u32 = 100;
pub const DEFAULT_QUEUE_DEPTH_MULTIPLIER: usize = 2;
pub const DEFAULT_TAGGER_PORT: u16 = 1795;
pub const DEFAULT_WSD_PORT: u16 = 5554;
pub const DEFAULT_DAEMON_PROBE_ATTEMPTS: u32 = 60;
pub const DEFAULT_DAEMON_PROBE_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);
pub const DEFAULT_LOCK_STALE_AGE_SEC: u64 = 300;

/// Default annotator option string: XML output, word-sense disambiguation,
/// and negation detection enabled, per §4.C.
pub const DEFAULT_ANNOTATOR_OPTIONS: &str = "--XMLf1 -y -Z";

/// Ports the annotator invoker and daemon supervisor agree on for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ports {
    pub tagger: u16,
    pub wsd: u16,
    /// Port of the first annotator instance, only meaningful when
    /// instances themselves expose a per-instance listener.
    pub first_annotator: Option<u16>,
}

impl Default for Ports {
    fn default() -> Self {
        Self {
            tagger: DEFAULT_TAGGER_PORT,
            wsd: DEFAULT_WSD_PORT,
            first_annotator: None,
        }
    }
}

/// The fully-resolved, immutable configuration for one `process`/`resume`/
/// `retry` invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub annotator_bin: PathBuf,
    pub annotator_options: String,
    pub pool_size: usize,
    pub per_file_timeout: Duration,
    pub max_attempts: u32,
    pub retry_base: Duration,
    pub retry_cap: Duration,
    pub input_ext: String,
    pub instance_file_limit: u32,
    pub ports: Ports,
    pub lock_stale_age: Duration,
}

/// Errors produced while resolving a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("annotator binary path not set (pass --annotator-bin or set ANNORUN_ANNOTATOR_BIN)")]
    MissingAnnotatorBin,
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Overrides collected from the environment, per §6 ("Environment variables
/// recognized"). Applied at construction time only — never re-read later.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub annotator_bin: Option<PathBuf>,
    pub annotator_options: Option<String>,
    pub pool_size: Option<usize>,
    pub per_file_timeout_sec: Option<u64>,
    pub tagger_port: Option<u16>,
    pub wsd_port: Option<u16>,
    pub first_annotator_port: Option<u16>,
}

impl EnvOverrides {
    /// Read the recognized environment variables once.
    pub fn from_env() -> Self {
        Self {
            annotator_bin: std::env::var_os("ANNORUN_ANNOTATOR_BIN").map(PathBuf::from),
            annotator_options: std::env::var("ANNORUN_ANNOTATOR_OPTIONS").ok(),
            pool_size: std::env::var("ANNORUN_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok()),
            per_file_timeout_sec: std::env::var("ANNORUN_PER_FILE_TIMEOUT_SEC")
                .ok()
                .and_then(|v| v.parse().ok()),
            tagger_port: std::env::var("ANNORUN_TAGGER_PORT")
                .ok()
                .and_then(|v| v.parse().ok()),
            wsd_port: std::env::var("ANNORUN_WSD_PORT")
                .ok()
                .and_then(|v| v.parse().ok()),
            first_annotator_port: std::env::var("ANNORUN_FIRST_ANNOTATOR_PORT")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

/// CLI-level overrides (`process`'s recognized options, per §6).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub annotator_bin: Option<PathBuf>,
    pub annotator_options: Option<String>,
    pub pool_size: Option<usize>,
    pub per_file_timeout_sec: Option<u64>,
    pub max_attempts: Option<u32>,
    pub retry_base_sec: Option<u64>,
    pub retry_cap_sec: Option<u64>,
    pub input_ext: Option<String>,
}

/// The default pool size formula from §4.E: `min(logical_cpus,
/// available_memory_gb / 2)`, at least 1.
pub fn default_pool_size(logical_cpus: usize, available_memory_gb: u64) -> usize {
    let memory_bound = (available_memory_gb / 2).max(1) as usize;
    logical_cpus.min(memory_bound).max(1)
}

impl Config {
    /// Build a `Config` by layering defaults < environment < CLI flags, in
    /// that precedence order (§10.1).
    pub fn resolve(
        env: &EnvOverrides,
        cli: &CliOverrides,
        logical_cpus: usize,
        available_memory_gb: u64,
    ) -> Result<Self, ConfigError> {
        let annotator_bin = cli
            .annotator_bin
            .clone()
            .or_else(|| env.annotator_bin.clone())
            .ok_or(ConfigError::MissingAnnotatorBin)?;

        let annotator_options = cli
            .annotator_options
            .clone()
            .or_else(|| env.annotator_options.clone())
            .unwrap_or_else(|| DEFAULT_ANNOTATOR_OPTIONS.to_string());

        let pool_size = cli
            .pool_size
            .or(env.pool_size)
            .unwrap_or_else(|| default_pool_size(logical_cpus, available_memory_gb));
        if pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool_size",
                value: "0".to_string(),
            });
        }

        let per_file_timeout_sec = cli
            .per_file_timeout_sec
            .or(env.per_file_timeout_sec)
            .unwrap_or(DEFAULT_PER_FILE_TIMEOUT_SEC);
        if per_file_timeout_sec == 0 {
            return Err(ConfigError::InvalidValue {
                field: "per_file_timeout_sec",
                value: "0".to_string(),
            });
        }

        let max_attempts = cli.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts",
                value: "0".to_string(),
            });
        }

        let retry_base_sec = cli.retry_base_sec.unwrap_or(DEFAULT_RETRY_BASE_SEC);
        let retry_cap_sec = cli.retry_cap_sec.unwrap_or(DEFAULT_RETRY_CAP_SEC);
        if retry_cap_sec < retry_base_sec {
            return Err(ConfigError::InvalidValue {
                field: "retry_cap_sec",
                value: retry_cap_sec.to_string(),
            });
        }

        let input_ext = cli
            .input_ext
            .clone()
            .unwrap_or_else(|| DEFAULT_INPUT_EXT.to_string());

        let ports = Ports {
            tagger: env.tagger_port.unwrap_or(DEFAULT_TAGGER_PORT),
            wsd: env.wsd_port.unwrap_or(DEFAULT_WSD_PORT),
            first_annotator: env.first_annotator_port,
        };

        Ok(Config {
            annotator_bin,
            annotator_options,
            pool_size,
            per_file_timeout: Duration::from_secs(per_file_timeout_sec),
            max_attempts,
            retry_base: Duration::from_secs(retry_base_sec),
            retry_cap: Duration::from_secs(retry_cap_sec),
            input_ext,
            instance_file_limit: DEFAULT_INSTANCE_FILE_LIMIT,
            ports,
            lock_stale_age: Duration::from_secs(DEFAULT_LOCK_STALE_AGE_SEC),
        })
    }

    /// Queue depth for the batch coordinator's bounded job queue (§5).
    pub fn queue_depth(&self) -> usize {
        self.pool_size * DEFAULT_QUEUE_DEPTH_MULTIPLIER
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
