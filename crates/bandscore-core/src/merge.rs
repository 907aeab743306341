//! Result merging: raw provider outputs into one canonical score.
//!
//! Per-dimension consensus across providers, with source-range
//! inference for un-normalized values, plus the deterministic/LLM
//! precedence combinator used when a question type has both an
//! objective check and a subjective judgment.

use std::collections::BTreeMap;

use serde_json::json;

use crate::domain::{CanonicalScore, Dimension, RawProviderResult, Section};
use crate::rubric::{self, RubricWeights};
use crate::scale;

/// Rationale text cap after concatenation.
const MAX_RATIONALE_CHARS: usize = 2_000;

/// Values above the canonical maximum are assumed to come from a 0-100
/// source range and are rescaled; everything else is already canonical.
fn canonicalize(value: f64) -> f64 {
    if value > 90.0 {
        value / 100.0 * 90.0
    } else {
        value
    }
}

fn join_rationales<'a>(rationales: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = rationales
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if joined.is_empty() {
        return None;
    }
    if joined.chars().count() > MAX_RATIONALE_CHARS {
        return Some(joined.chars().take(MAX_RATIONALE_CHARS).collect());
    }
    Some(joined)
}

/// Merge one or more raw provider results into a canonical score.
///
/// Each dimension takes the arithmetic mean of every provider that
/// reported it. When no dimension received a value, the providers' own
/// `overall` fields are averaged instead; when none supplied one either,
/// the overall is 0. Falls back to the section's default weights when
/// `weights` is not given.
pub fn merge(
    raws: &[RawProviderResult],
    section: Section,
    weights: Option<&RubricWeights>,
) -> CanonicalScore {
    let defaults;
    let weights = match weights {
        Some(weights) => weights,
        None => {
            defaults = rubric::default_weights(section);
            &defaults
        }
    };

    let mut collected: BTreeMap<Dimension, Vec<f64>> = BTreeMap::new();
    for raw in raws {
        for (dimension, value) in &raw.subscores {
            collected
                .entry(*dimension)
                .or_default()
                .push(canonicalize(*value));
        }
    }

    let subscores: BTreeMap<Dimension, u8> = collected
        .into_iter()
        .map(|(dimension, values)| {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            (dimension, scale::clamp_canonical(mean))
        })
        .collect();

    let overall = if subscores.is_empty() {
        let overalls: Vec<f64> = raws
            .iter()
            .filter_map(|raw| raw.overall)
            .map(canonicalize)
            .collect();
        if overalls.is_empty() {
            0
        } else {
            scale::clamp_canonical(overalls.iter().sum::<f64>() / overalls.len() as f64)
        }
    } else {
        scale::weighted_average(&subscores, Some(weights))
    };

    let rationale = join_rationales(raws.iter().filter_map(|raw| raw.rationale.as_deref()));

    let mut metadata = BTreeMap::new();
    let provider_metas: Vec<serde_json::Value> = raws
        .iter()
        .filter_map(|raw| serde_json::to_value(&raw.meta).ok())
        .collect();
    metadata.insert("providers".to_string(), json!(provider_metas));

    CanonicalScore {
        overall,
        subscores,
        rationale,
        metadata,
    }
}

/// Combine an objective check with a subjective judgment.
///
/// Deterministic subscores win per-dimension; LLM subscores fill in only
/// the dimensions the deterministic pass did not produce; the overall is
/// recomputed over the combined dimension set.
pub fn combine_deterministic_and_llm(
    deterministic: Option<&CanonicalScore>,
    llm: Option<&CanonicalScore>,
    weights: Option<&RubricWeights>,
) -> CanonicalScore {
    let (deterministic, llm) = match (deterministic, llm) {
        (None, None) => return CanonicalScore::zero(),
        (Some(det), None) => return det.clone(),
        (None, Some(llm)) => return llm.clone(),
        (Some(det), Some(llm)) => (det, llm),
    };

    let mut subscores = deterministic.subscores.clone();
    for (dimension, value) in &llm.subscores {
        subscores.entry(*dimension).or_insert(*value);
    }

    let overall = if subscores.is_empty() {
        if deterministic.overall > 0 {
            deterministic.overall
        } else {
            llm.overall
        }
    } else {
        scale::weighted_average(&subscores, weights)
    };

    let rationale = join_rationales(
        [
            deterministic.rationale.as_deref(),
            llm.rationale.as_deref(),
        ]
        .into_iter()
        .flatten(),
    );

    // Union the metadata; the deterministic side wins on key conflicts.
    let mut metadata = llm.metadata.clone();
    for (key, value) in &deterministic.metadata {
        metadata.insert(key.clone(), value.clone());
    }

    CanonicalScore {
        overall,
        subscores,
        rationale,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProviderKind, ProviderMeta};

    fn raw(kind: ProviderKind, subscores: &[(Dimension, f64)], overall: Option<f64>) -> RawProviderResult {
        RawProviderResult {
            overall,
            subscores: subscores.iter().copied().collect(),
            rationale: None,
            meta: ProviderMeta::new(kind),
        }
    }

    #[test]
    fn test_agreeing_providers_keep_their_value() {
        let merged = merge(
            &[
                raw(ProviderKind::OpenAi, &[(Dimension::Content, 80.0)], None),
                raw(ProviderKind::Gemini, &[(Dimension::Content, 80.0)], None),
            ],
            Section::Writing,
            None,
        );
        assert_eq!(merged.subscores[&Dimension::Content], 80);
    }

    #[test]
    fn test_disagreeing_providers_average() {
        let merged = merge(
            &[
                raw(ProviderKind::OpenAi, &[(Dimension::Content, 80.0)], None),
                raw(ProviderKind::DeepSeek, &[(Dimension::Content, 90.0)], None),
            ],
            Section::Writing,
            None,
        );
        assert_eq!(merged.subscores[&Dimension::Content], 85);
    }

    #[test]
    fn test_percent_range_values_are_rescaled() {
        // 100 on a 0-100 scale lands on 90 canonical; 85 stays as-is.
        let merged = merge(
            &[raw(
                ProviderKind::OpenAi,
                &[(Dimension::Content, 100.0), (Dimension::Grammar, 85.0)],
                None,
            )],
            Section::Writing,
            None,
        );
        assert_eq!(merged.subscores[&Dimension::Content], 90);
        assert_eq!(merged.subscores[&Dimension::Grammar], 85);
    }

    #[test]
    fn test_overall_fallback_chain() {
        // No subscores anywhere: average the provider overalls (95 -> 85.5 canonical).
        let merged = merge(
            &[
                raw(ProviderKind::OpenAi, &[], Some(95.0)),
                raw(ProviderKind::Gemini, &[], Some(60.0)),
            ],
            Section::Speaking,
            None,
        );
        assert!(merged.subscores.is_empty());
        assert_eq!(merged.overall, 73);

        // Nothing at all: defined floor.
        let empty = merge(
            &[raw(ProviderKind::OpenAi, &[], None)],
            Section::Speaking,
            None,
        );
        assert_eq!(empty.overall, 0);
    }

    #[test]
    fn test_rationales_concatenate_in_provider_order_and_truncate() {
        let mut first = raw(ProviderKind::OpenAi, &[(Dimension::Content, 70.0)], None);
        first.rationale = Some("first opinion".to_string());
        let mut second = raw(ProviderKind::Gemini, &[(Dimension::Content, 70.0)], None);
        second.rationale = Some("x".repeat(3_000));

        let merged = merge(&[first, second], Section::Writing, None);
        let rationale = merged.rationale.expect("rationale");
        assert!(rationale.starts_with("first opinion\n"));
        assert_eq!(rationale.chars().count(), 2_000);
    }

    #[test]
    fn test_merge_attaches_provider_metas() {
        let merged = merge(
            &[
                raw(ProviderKind::OpenAi, &[(Dimension::Content, 70.0)], None),
                raw(ProviderKind::Gemini, &[(Dimension::Content, 72.0)], None),
            ],
            Section::Writing,
            None,
        );
        let providers = merged.metadata["providers"].as_array().expect("array");
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0]["provider"], "openai");
    }

    #[test]
    fn test_combine_prefers_deterministic_dimensions() {
        let mut det = CanonicalScore::zero();
        det.subscores.insert(Dimension::Correctness, 60);
        det.overall = 60;

        let mut llm = CanonicalScore::zero();
        llm.subscores.insert(Dimension::Correctness, 20);
        llm.subscores.insert(Dimension::Content, 80);

        let combined = combine_deterministic_and_llm(Some(&det), Some(&llm), None);
        assert_eq!(combined.subscores[&Dimension::Correctness], 60);
        assert_eq!(combined.subscores[&Dimension::Content], 80);
        // Unweighted mean over the combined set.
        assert_eq!(combined.overall, 70);
    }

    #[test]
    fn test_combine_handles_missing_sides() {
        let mut det = CanonicalScore::zero();
        det.overall = 45;
        assert_eq!(
            combine_deterministic_and_llm(Some(&det), None, None).overall,
            45
        );
        assert_eq!(combine_deterministic_and_llm(None, None, None).overall, 0);
    }
}
