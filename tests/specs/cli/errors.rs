//! Exit-code and error-message specs for the config/state failure paths
//! that don't require a full batch run.

use crate::prelude::*;
use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn process_without_annotator_bin_exits_with_config_error() {
    let batch = Batch::new();
    batch.file("a.txt", "heart failure");

    cli()
        .without_annotator_bin()
        .args(&[
            "process",
            batch.input_path().to_str().unwrap(),
            batch.output_path().to_str().unwrap(),
        ])
        .command()
        .assert()
        .code(3)
        .stderr(predicate::str::contains("annotator binary"));
}

#[test]
fn status_on_missing_output_root_exits_with_config_error() {
    let output = tempfile::tempdir().unwrap();
    cli()
        .args(&["status", output.path().to_str().unwrap()])
        .command()
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no state found"));
}

#[test]
fn resume_on_missing_output_root_exits_with_config_error() {
    let output = tempfile::tempdir().unwrap();
    cli()
        .args(&["resume", output.path().to_str().unwrap()])
        .command()
        .assert()
        .code(3);
}

#[test]
fn retry_on_missing_output_root_exits_with_config_error() {
    let output = tempfile::tempdir().unwrap();
    cli()
        .args(&["retry", output.path().to_str().unwrap()])
        .command()
        .assert()
        .code(3);
}

#[test]
fn process_with_zero_pool_size_exits_with_config_error() {
    let batch = Batch::new();
    batch.file("a.txt", "heart failure");

    cli()
        .args(&[
            "process",
            batch.input_path().to_str().unwrap(),
            batch.output_path().to_str().unwrap(),
            "--pool-size",
            "0",
        ])
        .command()
        .assert()
        .code(3);
}
