// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parses the annotator's XML output into an ordered [`Concept`] sequence.
//!
//! `<Candidate>` elements are emitted from both the candidate list and the
//! mapping list — a mapping is just a nested set of candidates the
//! annotator selected as its final answer for a phrase; concepts sourced
//! from inside a `<Mapping>` element carry `is_mapping = true`. Tolerates
//! two position encodings: a repeated `<Position Start="" Length=""/>` list
//! (collapsed to the minimum start and summed length) or a single
//! `Start`/`Length` attribute pair on the candidate itself. Missing
//! optional fields become empty strings or zero, never a parse failure —
//! only malformed XML or an absent top-level result element fails the job.

use annorun_core::{Classify, ErrorKind};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("xml is not well-formed: {0}")]
    Malformed(#[from] quick_xml::Error),
    #[error("top-level result element is absent")]
    MissingRoot,
}

impl Classify for ParseError {
    fn classify(&self) -> ErrorKind {
        ErrorKind::Parse
    }
}

/// An in-progress concept being assembled while inside a `<Candidate>`
/// element, before it is finalized into an [`annorun_core::Concept`].
#[derive(Debug, Default)]
struct PartialConcept {
    concept_id: String,
    score: f64,
    matched_words: String,
    preferred_name: String,
    semantic_types: Vec<String>,
    source_vocabularies: Vec<String>,
    negated: bool,
    positions: Vec<(usize, usize)>,
    attr_start: Option<usize>,
    attr_length: Option<usize>,
    is_mapping: bool,
}

impl PartialConcept {
    fn finish(self, phrase_text: &str, utterance_id: &str) -> annorun_core::Concept {
        let (start, length) = if !self.positions.is_empty() {
            let min_start = self.positions.iter().map(|(s, _)| *s).min().unwrap_or(0);
            let total_length: usize = self.positions.iter().map(|(_, l)| *l).sum();
            (min_start, total_length.max(1))
        } else {
            (self.attr_start.unwrap_or(0), self.attr_length.unwrap_or(1))
        };

        annorun_core::Concept {
            concept_id: self.concept_id,
            score: self.score,
            matched_words: self.matched_words,
            preferred_name: self.preferred_name,
            phrase_text: phrase_text.to_string(),
            semantic_types: self.semantic_types,
            source_vocabularies: self.source_vocabularies,
            start,
            length,
            phrase_start: start,
            phrase_length: length,
            utterance_id: utterance_id.to_string(),
            negated: self.negated,
            is_mapping: self.is_mapping,
        }
    }
}

/// Parse a complete annotator XML document into its ordered concept
/// sequence. An empty but well-formed document with no utterances yields
/// an empty vector, not an error.
pub fn parse(xml: &str) -> Result<Vec<annorun_core::Concept>, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut concepts = Vec::new();
    let mut saw_root = false;
    let mut utterance_id = String::new();
    let mut phrase_text = String::new();
    let mut current: Option<PartialConcept> = None;
    let mut text_buf = String::new();
    let mut in_mapping = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "AnnotatorOutput" => saw_root = true,
                    "Utterance" => {
                        utterance_id = attr(&e, b"id").unwrap_or_default();
                    }
                    "Phrase" => {
                        phrase_text = attr(&e, b"text").unwrap_or_default();
                    }
                    "Mapping" => in_mapping = true,
                    "Candidate" => current = Some(candidate_from_attrs(&e, in_mapping)),
                    "Position" => record_position(&e, current.as_mut()),
                    "SemType" | "SemanticType" => text_buf.clear(),
                    "Source" => text_buf.clear(),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "AnnotatorOutput" => saw_root = true,
                    "Position" => record_position(&e, current.as_mut()),
                    "Candidate" => {
                        let c = candidate_from_attrs(&e, in_mapping);
                        concepts.push(c.finish(&phrase_text, &utterance_id));
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                text_buf = t.unescape().unwrap_or_default().into_owned();
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "SemType" | "SemanticType" => {
                        if let Some(c) = current.as_mut() {
                            if !text_buf.trim().is_empty() {
                                c.semantic_types.push(text_buf.trim().to_string());
                            }
                        }
                    }
                    "Source" => {
                        if let Some(c) = current.as_mut() {
                            if !text_buf.trim().is_empty() {
                                c.source_vocabularies.push(text_buf.trim().to_string());
                            }
                        }
                    }
                    "Candidate" => {
                        if let Some(c) = current.take() {
                            concepts.push(c.finish(&phrase_text, &utterance_id));
                        }
                    }
                    "Mapping" => in_mapping = false,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(ParseError::MissingRoot);
    }

    Ok(concepts)
}

fn candidate_from_attrs(e: &quick_xml::events::BytesStart<'_>, is_mapping: bool) -> PartialConcept {
    PartialConcept {
        concept_id: attr(e, b"CUI").unwrap_or_default(),
        score: attr(e, b"Score").and_then(|s| s.parse().ok()).unwrap_or(0.0),
        matched_words: attr(e, b"MatchedWords").unwrap_or_default(),
        preferred_name: attr(e, b"PreferredName").unwrap_or_default(),
        negated: attr(e, b"Negated")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        attr_start: attr(e, b"Start").and_then(|s| s.parse().ok()),
        attr_length: attr(e, b"Length").and_then(|s| s.parse().ok()),
        is_mapping,
        ..Default::default()
    }
}

fn record_position(e: &quick_xml::events::BytesStart<'_>, current: Option<&mut PartialConcept>) {
    let Some(c) = current else { return };
    let start = attr(e, b"Start").and_then(|s| s.parse().ok());
    let length = attr(e, b"Length").and_then(|s| s.parse().ok());
    if let (Some(start), Some(length)) = (start, length) {
        c.positions.push((start, length));
    }
}

fn attr(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

#[cfg(test)]
#[path = "xml_parser_tests.rs"]
mod tests;
