//! Offline heuristic fallback for the subjective sections.
//!
//! When every judgment backend fails or times out, the orchestrator
//! substitutes a rough estimate derived from observable signal only
//! (response length, reference coverage, paragraph shape). The result
//! carries provider = heuristic so callers can tell it apart in
//! diagnostics, and only the dimensions the signal actually supports.

use std::collections::BTreeMap;

use serde_json::json;

use crate::deterministic::text::normalize_tokens;
use crate::domain::{CanonicalScore, Dimension, ScoringRequest, Section, SectionPayload};
use crate::rubric;
use crate::scale;

/// Token count at which a spoken or written response is treated as a
/// full-length attempt.
const FULL_LENGTH_TOKENS: usize = 40;

/// Word count of a typical complete essay answer.
const ESSAY_TARGET_WORDS: usize = 200;

fn length_band(tokens: usize, full_length: usize) -> f64 {
    (tokens as f64 / full_length as f64).min(1.0)
}

/// Estimate a score for a subjective request without any provider.
///
/// Returns `None` for objective payloads, which never need a fallback.
pub fn estimate(request: &ScoringRequest) -> Option<CanonicalScore> {
    match &request.payload {
        SectionPayload::Speaking {
            transcript,
            reference_text,
            ..
        } => Some(estimate_speaking(transcript, reference_text.as_deref())),
        SectionPayload::Writing { text, .. } => Some(estimate_writing(text)),
        _ => None,
    }
}

fn estimate_speaking(transcript: &str, reference_text: Option<&str>) -> CanonicalScore {
    let tokens = normalize_tokens(transcript);

    let coverage = match reference_text.map(normalize_tokens) {
        Some(reference) if !reference.is_empty() => {
            (tokens.len() as f64 / reference.len() as f64).min(1.0)
        }
        _ => length_band(tokens.len(), FULL_LENGTH_TOKENS),
    };

    let subscores: BTreeMap<Dimension, u8> = [
        (
            Dimension::Content,
            scale::accuracy_to_canonical(coverage, false),
        ),
        (
            Dimension::Fluency,
            scale::accuracy_to_canonical(length_band(tokens.len(), FULL_LENGTH_TOKENS), false),
        ),
    ]
    .into_iter()
    .collect();

    heuristic_result(
        subscores,
        Section::Speaking,
        format!("estimated offline from a {}-word transcript", tokens.len()),
    )
}

fn estimate_writing(text: &str) -> CanonicalScore {
    let words = normalize_tokens(text).len();
    let paragraphs = text
        .split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .count();

    let subscores: BTreeMap<Dimension, u8> = [
        (
            Dimension::Content,
            scale::accuracy_to_canonical(length_band(words, ESSAY_TARGET_WORDS), false),
        ),
        (
            Dimension::Structure,
            scale::accuracy_to_canonical(length_band(paragraphs, 3), false),
        ),
    ]
    .into_iter()
    .collect();

    heuristic_result(
        subscores,
        Section::Writing,
        format!("estimated offline from a {words}-word response"),
    )
}

fn heuristic_result(
    subscores: BTreeMap<Dimension, u8>,
    section: Section,
    rationale: String,
) -> CanonicalScore {
    let weights = rubric::default_weights(section);
    let overall = scale::weighted_average(&subscores, Some(&weights));
    CanonicalScore {
        overall,
        subscores,
        rationale: Some(rationale),
        metadata: BTreeMap::new(),
    }
    .with_metadata("provider", json!("heuristic"))
}
