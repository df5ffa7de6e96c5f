//! A single input file produces the expected CSV row and a completed,
//! zero-exit-code batch.

use crate::prelude::*;
use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn single_file_batch_writes_expected_csv_row() {
    let batch = Batch::new();
    batch.file("note.txt", "patient presents with heart failure");

    cli()
        .args(&["process", batch.input_path().to_str().unwrap(), batch.output_path().to_str().unwrap()])
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));

    let csv = std::fs::read_to_string(batch.csv_path("note")).expect("csv output written");
    let mut lines = csv.lines();
    assert_eq!(lines.next().unwrap(), "CUI,Score,ConceptName,PrefName,Phrase,SemTypes,Sources,Position");
    assert_eq!(
        lines.next().unwrap(),
        "C0018801,1000,heart failure,Heart failure,heart failure,dsyn,MSH,0:13"
    );
    assert_eq!(lines.next().unwrap(), "# END_OF_FILE");
    assert!(lines.next().is_none());

    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(batch.state_path()).unwrap()).unwrap();
    assert_eq!(state["manifest"]["counters"]["completed"], 1);
    assert_eq!(state["manifest"]["counters"]["failed"], 0);
}

#[test]
fn empty_input_directory_completes_with_zero_files() {
    let batch = Batch::new();

    cli()
        .args(&["process", batch.input_path().to_str().unwrap(), batch.output_path().to_str().unwrap()])
        .command()
        .assert()
        .success();

    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(batch.state_path()).unwrap()).unwrap();
    assert_eq!(state["manifest"]["counters"]["completed"], 0);
    assert_eq!(state["manifest"]["total_files"], 0);
}
