// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A typed error carrying the process exit code it should produce, so
//! `main` can pull a specific code back out of an `anyhow::Error` chain
//! without every command threading a code through its `Result` type.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

/// Build an `anyhow::Error` that `main`'s downcast will recognize and exit
/// the process with `code` for.
pub fn exit_error(code: i32, message: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(ExitError::new(code, message))
}

pub const EXIT_OK: i32 = 0;
pub const EXIT_INTERRUPTED: i32 = 2;
pub const EXIT_CONFIG_ERROR: i32 = 3;
pub const EXIT_DAEMON_FAILURE: i32 = 4;
