// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output writer: renders a [`Concept`] stream into the per-file CSV output,
//! preserving the input's stem with a `.csv` suffix.
//!
//! Guarantees: written to a sibling temp file and atomically renamed into
//! place, so readers never observe a truncated file. The terminal marker
//! line `# END_OF_FILE` after the last record is the completion proof the
//! state manager checks on resume.

use annorun_core::{Classify, Concept, ErrorKind};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CSV_HEADER: &[&str] = &[
    "CUI", "Score", "ConceptName", "PrefName", "Phrase", "SemTypes", "Sources", "Position",
];

pub const COMPLETION_MARKER: &str = "# END_OF_FILE";

#[derive(Debug, Error)]
pub enum CsvWriteError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Classify for CsvWriteError {
    fn classify(&self) -> ErrorKind {
        ErrorKind::Io
    }
}

/// Derive `<output_root>/<stem>.csv` for `input_path`.
pub fn output_path_for(output_root: &Path, input_path: &Path) -> PathBuf {
    let stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_root.join(format!("{stem}.csv"))
}

/// Write `concepts` to `path` atomically: build the full file in a sibling
/// `.tmp`, fsync, then rename over `path`. An empty `concepts` slice still
/// produces a header-only CSV plus marker.
pub fn write_concepts(path: &Path, concepts: &[Concept]) -> Result<(), CsvWriteError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("csv.tmp");

    {
        let file = File::create(&tmp_path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(CSV_HEADER)?;
        for concept in concepts {
            writer.write_record(&[
                concept.concept_id.as_str(),
                &format_score(concept.score),
                concept.matched_words.as_str(),
                concept.preferred_name.as_str(),
                concept.phrase_text.as_str(),
                &concept.semantic_types.join(":"),
                &concept.source_vocabularies.join("|"),
                &format!("{}:{}", concept.start, concept.length),
            ])?;
        }
        writer.flush()?;
        let mut file = writer.into_inner().map_err(|e| e.into_error())?;
        writeln!(file, "{COMPLETION_MARKER}")?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        score.to_string()
    }
}

/// The completion proof: the CSV exists and its last line is the marker.
pub fn has_completion_marker(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    contents
        .lines()
        .next_back()
        .map(|line| line == COMPLETION_MARKER)
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "csv_writer_tests.rs"]
mod tests;
