// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake_annotator.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    use std::os::unix::fs::PermissionsExt;
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

#[test]
fn successful_invocation_cleans_up_input_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let bin = script(dir.path(), "echo '<ok/>' > \"$(echo \"$1\").xml\"; exit 0");
    let invoker = ProcessInvoker::new(
        bin,
        String::new(),
        dir.path().join("tmp"),
        dir.path().join("diag"),
        Duration::from_millis(500),
    );

    let result = invoker
        .invoke("diabetes mellitus", "job-1", Duration::from_secs(5))
        .unwrap();
    assert_eq!(result.exit_code, 0);

    let entries: Vec<_> = fs::read_dir(dir.path().join("tmp"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains("job-1") && e.file_name().to_string_lossy().ends_with(".in.txt"))
        .collect();
    assert!(entries.is_empty(), "input temp file should be removed on success");
}

#[test]
fn nonzero_exit_retains_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let bin = script(dir.path(), "exit 2");
    let invoker = ProcessInvoker::new(
        bin,
        String::new(),
        dir.path().join("tmp"),
        dir.path().join("diag"),
        Duration::from_millis(500),
    );

    let err = invoker
        .invoke("text", "job-2", Duration::from_secs(5))
        .unwrap_err();
    assert!(matches!(err, InvokeError::NonZeroExit(2)));
    assert!(dir.path().join("diag").join("job-2").exists());
}

#[test]
fn timeout_is_classified_as_retriable() {
    let err = InvokeError::Timeout(Duration::from_secs(1));
    assert_eq!(err.classify(), ErrorKind::Timeout);
    assert!(err.classify().is_retriable());
}

#[test]
fn slow_annotator_is_killed_after_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let bin = script(dir.path(), "sleep 30");
    let invoker = ProcessInvoker::new(
        bin,
        String::new(),
        dir.path().join("tmp"),
        dir.path().join("diag"),
        Duration::from_millis(200),
    );

    let err = invoker
        .invoke("text", "job-3", Duration::from_millis(300))
        .unwrap_err();
    assert!(matches!(err, InvokeError::Timeout(_)));
}
