//! SIGINT during a batch exits with the interrupted code and leaves state
//! that `resume` can pick back up without reprocessing completed files.

use crate::prelude::*;
use assert_cmd::prelude::*;
use std::process::Command;
use std::time::{Duration, Instant};

fn wait_for_exit(child: &mut std::process::Child, timeout: Duration) -> Option<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(Some(status)) = child.try_wait() {
            return Some(status);
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn sigint_interrupts_and_resume_finishes_the_rest() {
    let batch = Batch::new();
    for i in 0..8 {
        batch.file(&format!("note{i}.txt"), "heart failure");
    }

    let mut child = cli()
        .env("FAKE_ANNOTATOR_SLEEP_MS", "400")
        .args(&["process", batch.input_path().to_str().unwrap(), batch.output_path().to_str().unwrap(), "--pool-size", "1"])
        .command()
        .spawn()
        .expect("spawn process");

    std::thread::sleep(Duration::from_millis(900));

    let pid = child.id();
    Command::new("kill")
        .args(["-INT", &pid.to_string()])
        .status()
        .expect("send SIGINT");

    let status = wait_for_exit(&mut child, Duration::from_secs(10)).expect("process exits after SIGINT");
    assert_eq!(status.code(), Some(2));

    let state_before: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(batch.state_path()).unwrap()).unwrap();
    let completed_before = state_before["manifest"]["counters"]["completed"].as_u64().unwrap();
    assert!(completed_before >= 1, "expected at least one file to complete before the interrupt");
    assert!(completed_before < 8, "expected the interrupt to land before the whole batch finished");

    cli()
        .args(&["resume", batch.output_path().to_str().unwrap()])
        .command()
        .assert()
        .success();

    let state_after: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(batch.state_path()).unwrap()).unwrap();
    assert_eq!(state_after["manifest"]["counters"]["completed"], 8);
    assert_eq!(state_after["manifest"]["counters"]["failed"], 0);
}
