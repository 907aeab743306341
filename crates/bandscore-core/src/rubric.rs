//! Rubric catalog: per-section dimension weights and judgment prompts.
//!
//! Weights are embedded constants, injected into merge/average calls so
//! the scoring functions stay pure. Prompt building performs no I/O and
//! produces byte-identical output for identical input, which keeps
//! golden-file prompt tests and prompt diffing viable.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::domain::{Dimension, Section};

/// Per-section dimension weights. Non-negative; the merger normalizes
/// by the sum of weights actually present.
pub type RubricWeights = BTreeMap<Dimension, f64>;

/// Default weights table for a section.
pub fn default_weights(section: Section) -> RubricWeights {
    let entries: &[(Dimension, f64)] = match section {
        Section::Speaking => &[
            (Dimension::Content, 0.30),
            (Dimension::Pronunciation, 0.20),
            (Dimension::Fluency, 0.20),
            (Dimension::Grammar, 0.15),
            (Dimension::Vocabulary, 0.15),
        ],
        Section::Writing => &[
            (Dimension::Content, 0.25),
            (Dimension::Structure, 0.15),
            (Dimension::Coherence, 0.15),
            (Dimension::Grammar, 0.20),
            (Dimension::Vocabulary, 0.15),
            (Dimension::Spelling, 0.10),
        ],
        Section::Reading => &[(Dimension::Correctness, 1.0)],
        Section::Listening => &[(Dimension::Correctness, 0.70), (Dimension::Wer, 0.30)],
    };
    entries.iter().copied().collect()
}

/// System and user instruction pair for an LLM-backed judgment call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Inputs for a full judgment prompt (speaking/writing).
#[derive(Debug, Clone, Copy)]
pub struct JudgeContext<'a> {
    /// Task type label shown to the judge, e.g. "write_essay".
    pub task_label: &'a str,
    /// The candidate's response text or transcript.
    pub response: &'a str,
    /// Reference material (source text, prompt, expected sentence).
    pub reference: Option<&'a str>,
    /// When false, the output contract omits the rationale field.
    pub include_rationale: bool,
}

/// Inputs for a rationale-only prompt (reading/listening enrichment).
#[derive(Debug, Clone, Copy)]
pub struct ExplainContext<'a> {
    pub task_label: &'a str,
    /// Short description of the deterministic outcome to explain.
    pub summary: &'a str,
}

/// Literal JSON skeleton the judge must fill in.
fn json_skeleton(section: Section, include_rationale: bool) -> String {
    let mut skeleton = String::from("{");
    for dim in section.dimensions() {
        let _ = write!(skeleton, "\"{}\": 0, ", dim.as_str());
    }
    skeleton.push_str("\"overall\": 0");
    if include_rationale {
        skeleton.push_str(", \"rationale\": \"\"");
    }
    skeleton.push('}');
    skeleton
}

/// Build the judgment prompt for a subjective section.
///
/// Deterministic: identical input produces byte-identical output.
pub fn build_prompt(section: Section, ctx: &JudgeContext<'_>) -> PromptPair {
    let dimension_list = section
        .dimensions()
        .iter()
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut system = format!(
        "You are a strict examiner for a standardized English practice test. \
         Score the candidate's {section} response on these dimensions: {dimension_list}. \
         Every score is an integer from 0 (no evidence of the skill) to 90 (native-like command). \
         Respond with a single JSON object and nothing else: no markdown, no commentary."
    );
    if ctx.include_rationale {
        system.push_str(" Include a rationale of at most three sentences.");
    }

    let mut user = format!("Task type: {}\n", ctx.task_label);
    if let Some(reference) = ctx.reference {
        let _ = write!(user, "Reference material:\n{reference}\n");
    }
    let _ = write!(user, "Candidate response:\n{}\n", ctx.response);
    let _ = write!(
        user,
        "Return JSON exactly in this shape:\n{}",
        json_skeleton(section, ctx.include_rationale)
    );

    PromptPair { system, user }
}

/// Build a rationale-only prompt. Reading and listening correctness is
/// adjudicated deterministically; the judge only explains the outcome.
pub fn build_explain_prompt(section: Section, ctx: &ExplainContext<'_>) -> PromptPair {
    let system = format!(
        "You are a tutor for a standardized English practice test. \
         A candidate's {section} answer has already been graded. \
         Explain the outcome in at most three sentences, in plain language. \
         Respond with a single JSON object and nothing else."
    );

    let user = format!(
        "Task type: {}\nGraded outcome:\n{}\nReturn JSON exactly in this shape:\n{{\"rationale\": \"\"}}",
        ctx.task_label, ctx.summary,
    );

    PromptPair { system, user }
}
