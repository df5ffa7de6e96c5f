// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path identity normalization.
//!
//! An `InputFile`'s identity is its absolute, symlink-resolved path. To
//! guarantee the same file is never tracked under two keys, every path that
//! crosses a component boundary (enumeration, state manager lookups,
//! diagnostics) is normalized through [`normalize_path`] first.

use std::path::{Path, PathBuf};

/// Resolve `path` to an absolute, symlink-resolved form suitable for use as
/// a stable identity key.
///
/// Falls back to a best-effort absolute path (without symlink resolution)
/// if the path does not exist yet, so callers can normalize paths for files
/// that are about to be created (e.g. CSV outputs).
pub fn normalize_path(path: &Path) -> PathBuf {
    match path.canonicalize() {
        Ok(resolved) => resolved,
        Err(_) => {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        }
    }
}

/// The string key under which a path is tracked in persisted state.
///
/// On case-sensitive file systems this is simply the normalized path; on
/// case-insensitive ones (Windows, default macOS) it is additionally
/// lower-cased so that `Foo.txt` and `foo.txt` never produce two keys.
pub fn path_key(path: &Path) -> String {
    let normalized = normalize_path(path);
    let as_str = normalized.to_string_lossy().into_owned();
    if cfg!(any(target_os = "windows", target_os = "macos")) {
        as_str.to_lowercase()
    } else {
        as_str
    }
}

#[cfg(test)]
#[path = "path_key_tests.rs"]
mod tests;
