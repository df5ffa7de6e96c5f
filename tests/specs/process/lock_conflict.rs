//! Two concurrent `process` invocations against the same output root: the
//! second must fail immediately rather than corrupt the first's state.

use crate::prelude::*;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::thread;
use std::time::Duration;

#[test]
fn second_process_on_locked_output_root_fails_fast() {
    let batch = Batch::new();
    batch.file("a.txt", "heart failure");
    batch.file("b.txt", "heart failure");

    let mut first = cli()
        .env("FAKE_ANNOTATOR_SLEEP_MS", "600")
        .args(&["process", batch.input_path().to_str().unwrap(), batch.output_path().to_str().unwrap()])
        .command()
        .spawn()
        .expect("spawn first process");

    // Give the first invocation time to acquire the lock before the second
    // one tries.
    thread::sleep(Duration::from_millis(200));

    cli()
        .args(&["process", batch.input_path().to_str().unwrap(), batch.output_path().to_str().unwrap()])
        .command()
        .assert()
        .code(3)
        .stderr(predicate::str::contains("locked"));

    let status = first.wait().expect("first process exits");
    assert!(status.success());
}
