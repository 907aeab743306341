//! Scoring orchestration: the engine entry point.
//!
//! Per-request flow: validate, run the deterministic scorer when one is
//! registered for the payload, fan out to judgment providers raced
//! under the timeout budget, merge, return. Provider failures are
//! absorbed into heuristic fallbacks annotated in `metadata.ai_error`;
//! only request-shape violations reach the caller.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::json;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::deterministic;
use crate::domain::{
    CanonicalScore, ProviderKind, QuestionKind, RawProviderResult, Result, ScoreError,
    ScoringRequest, Section, SectionPayload,
};
use crate::heuristic;
use crate::merge;
use crate::provider::{
    ExplainTask, GeminiAdapter, JudgeOptions, OpenAiCompatAdapter, ProviderAdapter, SpeakingTask,
    UnavailableAdapter, WritingTask,
};

/// Token budget for judgment calls.
const JUDGE_MAX_TOKENS: u32 = 1_024;

enum SubjectiveTask {
    Speaking(SpeakingTask),
    Writing(WritingTask),
}

/// Provider-agnostic scoring orchestrator.
///
/// Stateless across requests: every call is independent and re-entrant,
/// and the configuration snapshot taken at construction is never
/// mutated.
pub struct ScoreOrchestrator {
    config: EngineConfig,
    providers: Vec<Arc<dyn ProviderAdapter>>,
}

impl ScoreOrchestrator {
    /// Build the orchestrator and its adapters from configuration.
    pub fn from_config(config: EngineConfig) -> Self {
        let providers = build_adapters(&config);
        Self { config, providers }
    }

    /// Inject pre-built adapters (tests, custom backends).
    pub fn with_providers(
        config: EngineConfig,
        providers: Vec<Arc<dyn ProviderAdapter>>,
    ) -> Self {
        Self { config, providers }
    }

    pub fn providers(&self) -> &[Arc<dyn ProviderAdapter>] {
        &self.providers
    }

    fn has_judgment_backend(&self) -> bool {
        self.providers
            .iter()
            .any(|provider| provider.kind() != ProviderKind::Unavailable)
    }

    fn timeout_ms(&self, request: &ScoringRequest) -> u64 {
        request
            .timeout_ms
            .filter(|timeout| *timeout > 0)
            .unwrap_or(self.config.timeout_ms)
    }

    /// Score one request.
    ///
    /// Never errors for recoverable conditions: provider unavailability,
    /// timeouts, and malformed judgments all degrade to valid results.
    pub async fn score(&self, request: &ScoringRequest) -> Result<CanonicalScore> {
        request.validate()?;
        let timeout_ms = self.timeout_ms(request);
        info!(
            event = "score.received",
            section = %request.section,
            question_type = %request.question_type,
            timeout_ms,
        );

        let deterministic = deterministic::score_payload(&request.payload);

        let mut result = match request.section {
            Section::Speaking | Section::Writing => {
                self.score_subjective(request, timeout_ms).await
            }
            Section::Reading | Section::Listening => {
                let graded = deterministic.ok_or_else(|| ScoreError::NoScoringPath {
                    section: request.section.to_string(),
                    question_type: request.question_type.clone(),
                })?;
                self.enrich_objective(request, graded, timeout_ms).await
            }
        };

        if !request.include_rationale {
            result.rationale = None;
        }

        info!(
            event = "score.completed",
            section = %request.section,
            overall = result.overall,
            fallback = result.metadata.contains_key("ai_error"),
        );
        Ok(result)
    }

    /// Speaking/writing: fan out to every provider under the timeout,
    /// merge whatever signal came back, or fall back to the heuristic.
    async fn score_subjective(&self, request: &ScoringRequest, timeout_ms: u64) -> CanonicalScore {
        let opts = JudgeOptions {
            timeout_ms,
            include_rationale: request.include_rationale,
            max_tokens: JUDGE_MAX_TOKENS,
        };
        let task = subjective_task(request);

        let calls = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let task = &task;
            let opts = &opts;
            async move {
                let call = async {
                    match task {
                        SubjectiveTask::Speaking(task) => provider.score_speaking(task, opts).await,
                        SubjectiveTask::Writing(task) => provider.score_writing(task, opts).await,
                    }
                };
                let outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), call).await;
                (provider.kind(), outcome)
            }
        });

        let mut raws: Vec<RawProviderResult> = Vec::new();
        let mut failures: Vec<String> = Vec::new();
        for (kind, outcome) in join_all(calls).await {
            match outcome {
                // The in-flight call lost the race and is dropped here;
                // the caller never waits past the budget.
                Err(_) => failures.push(format!("{kind}: timed out after {timeout_ms}ms")),
                Ok(Err(err)) => failures.push(format!("{kind}: {err}")),
                Ok(Ok(raw)) if raw.has_signal() => raws.push(raw),
                Ok(Ok(_)) => failures.push(format!("{kind}: returned no parseable judgment")),
            }
        }
        for failure in &failures {
            warn!(event = "provider.failed", section = %request.section, detail = %failure);
        }

        if raws.is_empty() {
            let mut fallback = heuristic::estimate(request).unwrap_or_else(CanonicalScore::zero);
            let reason = if failures.is_empty() {
                "no judgment provider configured".to_string()
            } else {
                failures.join("; ")
            };
            warn!(event = "score.fallback", section = %request.section, reason = %reason);
            fallback
                .metadata
                .insert("ai_error".to_string(), json!(reason));
            return fallback;
        }

        let mut merged = merge::merge(&raws, request.section, None);
        if !failures.is_empty() {
            merged
                .metadata
                .insert("ai_error".to_string(), json!(failures.join("; ")));
        }
        merged
    }

    /// Reading/listening: the deterministic result is authoritative; a
    /// provider may only contribute rationale text on top of it.
    async fn enrich_objective(
        &self,
        request: &ScoringRequest,
        graded: CanonicalScore,
        timeout_ms: u64,
    ) -> CanonicalScore {
        if !request.include_rationale || !self.has_judgment_backend() {
            return graded;
        }

        let provider = &self.providers[0];
        let opts = JudgeOptions {
            timeout_ms,
            include_rationale: true,
            max_tokens: JUDGE_MAX_TOKENS,
        };
        let task = ExplainTask {
            task_label: canonical_label(&request.question_type),
            summary: outcome_summary(&graded),
        };

        let call = async {
            match request.section {
                Section::Listening => provider.explain_listening(&task, &opts).await,
                _ => provider.explain_reading(&task, &opts).await,
            }
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
            Ok(Ok(raw)) if raw.rationale.is_some() => {
                let weights = crate::rubric::default_weights(request.section);
                let explained = merge::merge(&[raw], request.section, Some(&weights));
                merge::combine_deterministic_and_llm(
                    Some(&graded),
                    Some(&explained),
                    Some(&weights),
                )
            }
            Ok(Ok(_)) => graded,
            Ok(Err(err)) => annotate_ai_error(graded, &err.to_string(), request.section),
            Err(_) => annotate_ai_error(
                graded,
                &format!("timed out after {timeout_ms}ms"),
                request.section,
            ),
        }
    }
}

fn annotate_ai_error(
    mut graded: CanonicalScore,
    reason: &str,
    section: Section,
) -> CanonicalScore {
    warn!(event = "provider.failed", section = %section, detail = %reason);
    graded
        .metadata
        .insert("ai_error".to_string(), json!(reason));
    graded
}

/// Canonical prompt label for a task type; unknown labels pass through.
fn canonical_label(question_type: &str) -> String {
    QuestionKind::parse(question_type)
        .map(|kind| kind.label().to_string())
        .unwrap_or_else(|| question_type.trim().to_string())
}

fn subjective_task(request: &ScoringRequest) -> SubjectiveTask {
    let task_label = canonical_label(&request.question_type);
    match &request.payload {
        SectionPayload::Speaking {
            transcript,
            reference_text,
            ..
        } => SubjectiveTask::Speaking(SpeakingTask {
            task_label,
            transcript: transcript.clone(),
            reference_text: reference_text.clone(),
        }),
        SectionPayload::Writing { text, prompt } => SubjectiveTask::Writing(WritingTask {
            task_label,
            text: text.clone(),
            prompt: prompt.clone(),
        }),
        // validate() rejects subjective sections with objective payloads.
        _ => SubjectiveTask::Writing(WritingTask {
            task_label,
            text: String::new(),
            prompt: None,
        }),
    }
}

/// Short description of a graded outcome, embedded in explain prompts.
fn outcome_summary(graded: &CanonicalScore) -> String {
    match graded.rationale.as_deref() {
        Some(rationale) => format!("{rationale}; scored {} of 90", graded.overall),
        None => format!("scored {} of 90", graded.overall),
    }
}

fn build_adapters(config: &EngineConfig) -> Vec<Arc<dyn ProviderAdapter>> {
    if config.providers.is_empty() {
        return vec![Arc::new(UnavailableAdapter::new())];
    }
    config
        .providers
        .iter()
        .map(|provider| match provider.kind {
            ProviderKind::OpenAi => {
                Arc::new(OpenAiCompatAdapter::openai(provider)) as Arc<dyn ProviderAdapter>
            }
            ProviderKind::DeepSeek => Arc::new(OpenAiCompatAdapter::deepseek(provider)),
            ProviderKind::Gemini => Arc::new(GeminiAdapter::new(provider)),
            _ => Arc::new(UnavailableAdapter::new()),
        })
        .collect()
}
