// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-cutting failure classification.
//!
//! `ErrorKind` is independent of any crate's `thiserror` variants — it is
//! what gets persisted in a `FileRecord` and driven through the retry
//! controller. Every fallible boundary in the crate eventually maps its
//! concrete error into one of these kinds via [`Classify`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// The classification of a job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The annotator child exceeded its per-file timeout.
    Timeout,
    /// The annotator's XML output was malformed or structurally unexpected.
    Parse,
    /// A TCP probe to the tagger or WSD daemon failed during a job.
    DaemonUnreachable,
    /// Input unreadable, output unwritable, or a temp-file operation failed.
    Io,
    /// Unable to lease an instance within the configured timeout.
    PoolExhausted,
    /// Any failure not classified above.
    Unknown,
}

impl ErrorKind {
    /// Whether a job that failed with this kind should be retried.
    ///
    /// `Parse` is the one non-retriable kind: malformed annotator output for
    /// a given input is deterministic, so retrying wastes an instance lease
    /// on a guaranteed repeat failure.
    pub fn is_retriable(self) -> bool {
        !matches!(self, ErrorKind::Parse)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Parse => "parse",
            ErrorKind::DaemonUnreachable => "daemon_unreachable",
            ErrorKind::Io => "io",
            ErrorKind::PoolExhausted => "pool_exhausted",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maps a concrete error type onto the shared [`ErrorKind`] taxonomy.
pub trait Classify {
    fn classify(&self) -> ErrorKind;
}

#[cfg(test)]
#[path = "error_kind_tests.rs"]
mod tests;
