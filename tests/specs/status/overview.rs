//! `status` without flags prints the run overview and a per-file table.

use crate::prelude::*;
use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn status_overview_reports_counts_and_files() {
    let batch = Batch::new();
    batch.file("a.txt", "heart failure");
    batch.file("b.txt", "heart failure");

    cli()
        .args(&["process", batch.input_path().to_str().unwrap(), batch.output_path().to_str().unwrap()])
        .command()
        .assert()
        .success();

    cli()
        .args(&["status", batch.output_path().to_str().unwrap()])
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("completed: 2"))
        .stdout(predicate::str::contains("failed:    0"))
        .stdout(predicate::str::contains("remaining: 0"))
        .stdout(predicate::str::contains("a.txt"))
        .stdout(predicate::str::contains("b.txt"));
}
