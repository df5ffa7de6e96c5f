//! When a daemon port is already bound externally, the supervisor adopts
//! it instead of spawning a duplicate, and never touches it on shutdown.

use crate::prelude::*;
use assert_cmd::prelude::*;
use std::net::TcpStream;
use std::process::{Command, Stdio};
use std::time::Duration;

#[test]
fn externally_running_tagger_is_adopted_not_killed() {
    let batch = Batch::new();
    batch.file("a.txt", "heart failure");

    let tagger_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut external_tagger = Command::new(fake_daemon())
        .arg(tagger_port.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn external tagger");

    // Wait for it to actually start listening.
    for _ in 0..50 {
        if TcpStream::connect_timeout(&format!("127.0.0.1:{tagger_port}").parse().unwrap(), Duration::from_millis(100)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    cli()
        .env("ANNORUN_TAGGER_PORT", tagger_port.to_string())
        .args(&["process", batch.input_path().to_str().unwrap(), batch.output_path().to_str().unwrap()])
        .command()
        .assert()
        .success();

    // The external daemon must still be alive: the supervisor never kills
    // entries it did not spawn itself.
    assert!(external_tagger.try_wait().unwrap().is_none(), "externally-owned daemon should survive batch shutdown");
    assert!(TcpStream::connect_timeout(&format!("127.0.0.1:{tagger_port}").parse().unwrap(), Duration::from_millis(200)).is_ok());

    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(batch.state_path()).unwrap()).unwrap();
    let run_id = state["manifest"]["run_id"].as_str().unwrap().to_string();
    let log_path = batch.output_path().join("logs").join(format!("run-{run_id}.log"));
    let log = std::fs::read_to_string(&log_path).unwrap_or_default();
    assert!(log.contains("already reachable"), "expected adoption log line, got: {log}");

    let _ = external_tagger.kill();
    let _ = external_tagger.wait();
}
