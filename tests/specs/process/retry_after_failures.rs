//! A file that exhausts its attempts and fails, then succeeds once
//! `retry` re-enqueues it with a reset attempt count.

use crate::prelude::*;
use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn retry_resets_and_completes_a_previously_failed_file() {
    let batch = Batch::new();
    batch.file("fail_note.txt", "heart failure");
    batch.file("ok_note.txt", "heart failure");

    cli()
        .env("FAKE_ANNOTATOR_FAIL_PATTERN", "fail")
        .args(&[
            "process",
            batch.input_path().to_str().unwrap(),
            batch.output_path().to_str().unwrap(),
            "--max-attempts",
            "2",
            "--retry-base-sec",
            "1",
            "--retry-cap-sec",
            "1",
        ])
        .command()
        .assert()
        .success();

    cli()
        .args(&["status", batch.output_path().to_str().unwrap(), "--failed-only"])
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("fail_note.txt"));

    cli()
        .args(&["retry", batch.output_path().to_str().unwrap()])
        .command()
        .assert()
        .success();

    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(batch.state_path()).unwrap()).unwrap();
    assert_eq!(state["manifest"]["counters"]["completed"], 2);
    assert_eq!(state["manifest"]["counters"]["failed"], 0);
}

#[test]
fn retry_with_no_failed_files_is_a_no_op() {
    let batch = Batch::new();
    batch.file("ok_note.txt", "heart failure");

    cli()
        .args(&["process", batch.input_path().to_str().unwrap(), batch.output_path().to_str().unwrap()])
        .command()
        .assert()
        .success();

    cli()
        .args(&["retry", batch.output_path().to_str().unwrap()])
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("no failed files to retry"));
}
