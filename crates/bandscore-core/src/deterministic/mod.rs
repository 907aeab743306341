//! Deterministic scorers for objectively-gradable question types.
//!
//! Pure functions with no external calls: exact-match checks,
//! partial-credit set and ordering algorithms, and word-error-rate
//! dictation grading. These run synchronously before any provider is
//! consulted and cannot fail.

pub mod text;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use crate::domain::{CanonicalScore, Dimension, SectionPayload};
use crate::rubric;
use crate::scale;

use text::{edit_distance, normalize_answer, normalize_tokens};

/// Assemble a canonical result from deterministic subscores.
fn deterministic_result(
    subscores: BTreeMap<Dimension, u8>,
    weights: Option<&rubric::RubricWeights>,
    rationale: String,
) -> CanonicalScore {
    let overall = scale::weighted_average(&subscores, weights);
    CanonicalScore {
        overall,
        subscores,
        rationale: Some(rationale),
        metadata: BTreeMap::new(),
    }
    .with_metadata("provider", json!("deterministic"))
}

/// Grade the payload if a deterministic scorer is registered for it.
///
/// Subjective payloads (speaking/writing free text) return `None`.
pub fn score_payload(payload: &SectionPayload) -> Option<CanonicalScore> {
    match payload {
        SectionPayload::SingleChoice { selected, correct } => {
            Some(score_single_choice(selected, correct))
        }
        SectionPayload::MultiChoice { selected, correct } => {
            Some(score_multi_choice(selected, correct))
        }
        SectionPayload::FillBlanks { answers, correct } => {
            Some(score_fill_blanks(answers, correct))
        }
        SectionPayload::Reorder {
            user_order,
            correct_order,
        } => Some(score_reorder(user_order, correct_order)),
        SectionPayload::Dictation {
            target_text,
            user_text,
        } => Some(score_dictation(target_text, user_text)),
        SectionPayload::Speaking { .. } | SectionPayload::Writing { .. } => None,
    }
}

/// Single-select: case-insensitive, trimmed comparison. All or nothing.
pub fn score_single_choice(selected: &str, correct: &str) -> CanonicalScore {
    let hit = !normalize_answer(correct).is_empty()
        && normalize_answer(selected) == normalize_answer(correct);
    let score = if hit { 90 } else { 0 };
    let rationale = if hit {
        "selected option matches the key".to_string()
    } else {
        "selected option does not match the key".to_string()
    };
    deterministic_result(
        [(Dimension::Correctness, score)].into_iter().collect(),
        None,
        rationale,
    )
}

/// Multi-select with over-selection penalty.
///
/// accuracy = clamp01(max(0, TP - FP) / |Correct|); an empty key scores 0.
pub fn score_multi_choice(selected: &[String], correct: &[String]) -> CanonicalScore {
    let correct_set: BTreeSet<String> = correct
        .iter()
        .map(|option| normalize_answer(option))
        .filter(|option| !option.is_empty())
        .collect();
    let selected_set: BTreeSet<String> = selected
        .iter()
        .map(|option| normalize_answer(option))
        .filter(|option| !option.is_empty())
        .collect();

    let true_positives = selected_set.intersection(&correct_set).count();
    let false_positives = selected_set.len() - true_positives;

    let ratio = if correct_set.is_empty() {
        0.0
    } else {
        let credit = true_positives.saturating_sub(false_positives);
        (credit as f64 / correct_set.len() as f64).clamp(0.0, 1.0)
    };

    let score = scale::accuracy_to_canonical(ratio, false);
    let rationale = format!(
        "{true_positives} correct and {false_positives} extra of {} required options",
        correct_set.len(),
    );
    deterministic_result(
        [(Dimension::Correctness, score)].into_iter().collect(),
        None,
        rationale,
    )
}

/// Fill-in-blanks: per-blank normalized equality, aligned by index.
/// Missing trailing answers count as wrong; an empty key scores 0.
pub fn score_fill_blanks(answers: &[String], correct: &[String]) -> CanonicalScore {
    let total = correct.len();
    let hits = correct
        .iter()
        .enumerate()
        .filter(|(index, expected)| {
            answers
                .get(*index)
                .is_some_and(|answer| normalize_answer(answer) == normalize_answer(expected))
        })
        .count();

    let ratio = if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    };

    deterministic_result(
        [(
            Dimension::Correctness,
            scale::accuracy_to_canonical(ratio, false),
        )]
        .into_iter()
        .collect(),
        None,
        format!("{hits} of {total} blanks correct"),
    )
}

/// Reorder-paragraphs: pairwise order agreement.
///
/// For every unordered pair of items, agreement counts when their
/// relative order in the user's sequence matches the key. A single
/// transposition among 3 items keeps 2 of 3 pairs and scores ~67%, not 0.
pub fn score_reorder(user_order: &[String], correct_order: &[String]) -> CanonicalScore {
    let n = correct_order.len();

    if n < 2 {
        // No pairs to compare; only an exact match earns credit.
        let exact = user_order == correct_order;
        let score = if exact { 90 } else { 0 };
        return deterministic_result(
            [(Dimension::Correctness, score)].into_iter().collect(),
            None,
            format!("sequence of {n} item(s) {}", if exact { "matches" } else { "differs" }),
        );
    }

    let rank_of = |item: &String| correct_order.iter().position(|key| key == item);
    let user_ranks: Vec<usize> = user_order.iter().filter_map(rank_of).collect();

    let mut agreements = 0usize;
    for i in 0..user_ranks.len() {
        for j in (i + 1)..user_ranks.len() {
            if user_ranks[i] < user_ranks[j] {
                agreements += 1;
            }
        }
    }

    let total_pairs = n * (n - 1) / 2;
    let ratio = agreements as f64 / total_pairs as f64;

    deterministic_result(
        [(
            Dimension::Correctness,
            scale::accuracy_to_canonical(ratio, false),
        )]
        .into_iter()
        .collect(),
        None,
        format!("{agreements} of {total_pairs} paragraph pairs in correct relative order"),
    )
}

/// Dictation: word-error-rate grading against the reference sentence.
///
/// Both subscores are kept because they answer different questions:
/// `wer` penalizes every edit, while `correctness` saturates once the
/// transcript is a total mismatch.
pub fn score_dictation(target_text: &str, user_text: &str) -> CanonicalScore {
    let target = normalize_tokens(target_text);
    let candidate = normalize_tokens(user_text);

    let edits = edit_distance(&target, &candidate);
    let wer = edits as f64 / target.len().max(1) as f64;

    let subscores: BTreeMap<Dimension, u8> = [
        (
            Dimension::Correctness,
            scale::accuracy_to_canonical(1.0 - wer.min(1.0), false),
        ),
        (Dimension::Wer, scale::edit_rate_to_canonical(wer)),
    ]
    .into_iter()
    .collect();

    let weights = rubric::default_weights(crate::domain::Section::Listening);
    deterministic_result(
        subscores,
        Some(&weights),
        format!(
            "{edits} word edit(s) against {} reference word(s), WER {wer:.2}",
            target.len(),
        ),
    )
}
