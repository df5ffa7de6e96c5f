// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The concept record produced by the XML parser and consumed by the
//! output writer. Value type, passed by copy between components.

use serde::{Deserialize, Serialize};

/// One extracted concept, corresponding to a single candidate/mapping
/// entry in the annotator's XML output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub concept_id: String,
    pub score: f64,
    pub matched_words: String,
    pub preferred_name: String,
    pub phrase_text: String,
    pub semantic_types: Vec<String>,
    pub source_vocabularies: Vec<String>,
    pub start: usize,
    pub length: usize,
    pub phrase_start: usize,
    pub phrase_length: usize,
    pub utterance_id: String,
    pub negated: bool,
    /// Set when this concept came from the annotator's selected mapping
    /// list rather than its raw candidate list.
    pub is_mapping: bool,
}

/// Error produced when a [`Concept`] fails its own invariants.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConceptError {
    #[error("concept length must be at least 1, got {0}")]
    ZeroLength(usize),
    #[error("concept span {start}+{length} exceeds source length {source_len}")]
    OutOfBounds {
        start: usize,
        length: usize,
        source_len: usize,
    },
}

impl Concept {
    /// Validate this concept's character span against the source text it
    /// was extracted from.
    ///
    /// Invariants: `length >= 1` and `start + length <= source_len`.
    /// `start >= 0` is guaranteed by the type (`usize`).
    pub fn validate_span(&self, source_len: usize) -> Result<(), ConceptError> {
        if self.length == 0 {
            return Err(ConceptError::ZeroLength(self.length));
        }
        if self.start + self.length > source_len {
            return Err(ConceptError::OutOfBounds {
                start: self.start,
                length: self.length,
                source_len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "concept_tests.rs"]
mod tests;
