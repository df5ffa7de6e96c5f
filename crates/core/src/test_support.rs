// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test builders for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::concept::Concept;
use crate::file_record::FileRecord;
use crate::input_file::InputFile;
use crate::instance::{Instance, InstanceId};
use crate::job::{Job, JobId};
use crate::run_manifest::RunManifest;
use std::path::{Path, PathBuf};

pub fn input_file(path: &Path, size: u64) -> InputFile {
    InputFile::new(path, size, None)
}

pub fn job(id: &str, path: &str) -> Job {
    Job::first_attempt(JobId::new(id), PathBuf::from(path))
}

pub fn instance(id: &str, pid: u32) -> Instance {
    Instance::new(InstanceId::new(id), pid, 1_000)
}

pub fn pending_record() -> FileRecord {
    FileRecord::pending()
}

pub fn completed_record(concepts_extracted: u64) -> FileRecord {
    let mut record = FileRecord::pending();
    record.mark_in_progress(1_000);
    record.mark_completed(concepts_extracted, 1.5);
    record
}

pub fn concept(concept_id: &str, start: usize, length: usize) -> Concept {
    Concept {
        concept_id: concept_id.to_string(),
        score: -1000.0,
        matched_words: "test phrase".to_string(),
        preferred_name: "Test Concept".to_string(),
        phrase_text: "test phrase".to_string(),
        semantic_types: vec!["dsyn".to_string()],
        source_vocabularies: vec!["SNOMEDCT_US".to_string()],
        start,
        length,
        phrase_start: start,
        phrase_length: length,
        utterance_id: "0".to_string(),
        negated: false,
        is_mapping: false,
    }
}

pub fn run_manifest(run_id: &str, total_files: u64) -> RunManifest {
    RunManifest::new(
        run_id.to_string(),
        1_000,
        2,
        PathBuf::from("/opt/annotator/bin/run"),
        1795,
        5554,
        total_files,
        PathBuf::from("/data/in"),
    )
}
