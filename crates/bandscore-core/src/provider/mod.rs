//! Judgment provider seam.
//!
//! Defines the `ProviderAdapter` async trait implemented per backend,
//! the call options every adapter must honor, and the strict-JSON
//! judgment parser. Parsing failures never become errors: malformed
//! backend output degrades to an empty raw result so a missing signal
//! can never abort a scoring attempt.

pub mod gemini;
pub mod openai;
pub mod unavailable;

use async_trait::async_trait;

use crate::domain::{Dimension, ProviderKind, ProviderMeta, RawProviderResult};

pub use gemini::GeminiAdapter;
pub use openai::OpenAiCompatAdapter;
pub use unavailable::UnavailableAdapter;

/// Result of a cheap connectivity probe. Never an error; failures are
/// carried in `ok = false` plus a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHealth {
    pub ok: bool,
    pub latency_ms: Option<u64>,
    pub model: Option<String>,
    pub error: Option<String>,
}

impl ProviderHealth {
    pub fn healthy(latency_ms: u64, model: impl Into<String>) -> Self {
        Self {
            ok: true,
            latency_ms: Some(latency_ms),
            model: Some(model.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            latency_ms: None,
            model: None,
            error: Some(error.into()),
        }
    }
}

/// Per-call knobs the orchestrator passes down. Every backend call
/// carries a bounded token budget and the caller's timeout.
#[derive(Debug, Clone, Copy)]
pub struct JudgeOptions {
    pub timeout_ms: u64,
    pub include_rationale: bool,
    pub max_tokens: u32,
}

impl Default for JudgeOptions {
    fn default() -> Self {
        Self {
            timeout_ms: crate::config::DEFAULT_TIMEOUT_MS,
            include_rationale: true,
            max_tokens: 1024,
        }
    }
}

/// Speaking input: a transcript plus optional reference sentence/text.
#[derive(Debug, Clone)]
pub struct SpeakingTask {
    pub task_label: String,
    pub transcript: String,
    pub reference_text: Option<String>,
}

/// Writing input: candidate text plus the optional essay prompt.
#[derive(Debug, Clone)]
pub struct WritingTask {
    pub task_label: String,
    pub text: String,
    pub prompt: Option<String>,
}

/// Rationale-only input for the deterministically-graded sections.
#[derive(Debug, Clone)]
pub struct ExplainTask {
    pub task_label: String,
    pub summary: String,
}

/// Backend-level failures. All of these are absorbed by the
/// orchestrator's fallback path and never surface to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider '{0}' is not configured")]
    Unavailable(ProviderKind),

    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("backend call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// A judgment backend.
///
/// Adapters are stateless after construction, hold their own
/// credentials, and may be selected and ordered by the orchestrator
/// without any backend-specific knowledge.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Cheap connectivity probe. Must not error.
    async fn health(&self) -> ProviderHealth;

    async fn score_speaking(
        &self,
        task: &SpeakingTask,
        opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError>;

    async fn score_writing(
        &self,
        task: &WritingTask,
        opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError>;

    /// Rationale-only: reading correctness is adjudicated
    /// deterministically, so the result carries no subscores.
    async fn explain_reading(
        &self,
        task: &ExplainTask,
        opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError>;

    /// Rationale-only, like [`ProviderAdapter::explain_reading`].
    async fn explain_listening(
        &self,
        task: &ExplainTask,
        opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError>;
}

/// Slice the judgment JSON out of model output.
///
/// Models wrap JSON in markdown fences or lead-in text often enough
/// that a raw parse is not enough; everything outside the outermost
/// braces is discarded before the strict parse.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse backend output into a raw result.
///
/// Known dimension fields and a handful of overall/rationale aliases
/// are lifted; everything else is ignored. Any parse failure yields an
/// empty result carrying only `meta`.
pub fn parse_judgment(text: &str, meta: ProviderMeta) -> RawProviderResult {
    let Some(json) = extract_json(text) else {
        return RawProviderResult::empty(meta);
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(json) else {
        return RawProviderResult::empty(meta);
    };
    let Some(object) = value.as_object() else {
        return RawProviderResult::empty(meta);
    };

    let mut result = RawProviderResult::empty(meta);

    for (key, field) in object {
        if let Some(dimension) = Dimension::from_label(key) {
            if let Some(score) = field.as_f64() {
                result.subscores.insert(dimension, score);
            }
            continue;
        }
        match key.trim().to_ascii_lowercase().as_str() {
            "overall" | "score" | "total" => {
                if let Some(score) = field.as_f64() {
                    result.overall = Some(score);
                }
            }
            "rationale" | "reason" | "feedback" | "explanation" => {
                if let Some(rationale) = field.as_str() {
                    if !rationale.trim().is_empty() {
                        result.rationale = Some(rationale.trim().to_string());
                    }
                }
            }
            // Some backends nest the scores one level down.
            "subscores" | "scores" | "dimensions" => {
                if let Some(nested) = field.as_object() {
                    for (nested_key, nested_value) in nested {
                        if let (Some(dimension), Some(score)) =
                            (Dimension::from_label(nested_key), nested_value.as_f64())
                        {
                            result.subscores.insert(dimension, score);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    result
}
