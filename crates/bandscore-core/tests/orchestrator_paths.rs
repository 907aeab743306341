//! End-to-end orchestrator paths with injected fake providers.
//!
//! Covers the fallback guarantees: a throwing or hanging provider never
//! surfaces as a caller-visible error, partial provider failures still
//! merge, and the deterministic path works with no backend at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use bandscore_core::provider::parse_judgment;
use bandscore_core::{
    CanonicalScore, EngineConfig, ExplainTask, JudgeOptions, ProviderAdapter, ProviderError,
    ProviderHealth, ProviderKind, ProviderMeta, RawProviderResult, ScoreError, ScoreOrchestrator,
    ScoringRequest, Section, SectionPayload, SpeakingTask, WritingTask,
};

#[derive(Clone)]
enum Behavior {
    /// Return this raw model output, run through the real parser.
    Judgment(&'static str),
    /// Fail with a transport error.
    Fail,
    /// Never answer within any realistic budget.
    Hang,
}

struct StubAdapter {
    kind: ProviderKind,
    behavior: Behavior,
}

impl StubAdapter {
    fn new(kind: ProviderKind, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self { kind, behavior })
    }

    async fn respond(&self) -> Result<RawProviderResult, ProviderError> {
        match &self.behavior {
            Behavior::Judgment(text) => Ok(parse_judgment(text, ProviderMeta::new(self.kind))),
            Behavior::Fail => Err(ProviderError::Transport("connection refused".to_string())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Err(ProviderError::Transport("woke up after an hour".to_string()))
            }
        }
    }
}

#[async_trait]
impl ProviderAdapter for StubAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn health(&self) -> ProviderHealth {
        ProviderHealth::healthy(1, "stub-model")
    }

    async fn score_speaking(
        &self,
        _task: &SpeakingTask,
        _opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        self.respond().await
    }

    async fn score_writing(
        &self,
        _task: &WritingTask,
        _opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        self.respond().await
    }

    async fn explain_reading(
        &self,
        _task: &ExplainTask,
        _opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        self.respond().await
    }

    async fn explain_listening(
        &self,
        _task: &ExplainTask,
        _opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        self.respond().await
    }
}

fn orchestrator_with(providers: Vec<Arc<dyn ProviderAdapter>>) -> ScoreOrchestrator {
    ScoreOrchestrator::with_providers(EngineConfig::default(), providers)
}

fn writing_request() -> ScoringRequest {
    ScoringRequest {
        section: Section::Writing,
        question_type: "write_essay".to_string(),
        payload: SectionPayload::Writing {
            text: "Public transport reduces congestion and emissions. ".repeat(20),
            prompt: Some("Discuss the role of public transport.".to_string()),
        },
        include_rationale: true,
        timeout_ms: Some(500),
    }
}

fn assert_valid(score: &CanonicalScore) {
    assert!(score.overall <= 90);
    for value in score.subscores.values() {
        assert!(*value <= 90);
    }
}

#[tokio::test]
async fn erroring_provider_falls_back_without_surfacing() {
    let orchestrator = orchestrator_with(vec![StubAdapter::new(
        ProviderKind::OpenAi,
        Behavior::Fail,
    )]);

    let score = orchestrator
        .score(&writing_request())
        .await
        .expect("fallback result, not an error");

    assert_valid(&score);
    let ai_error = score.metadata["ai_error"].as_str().expect("ai_error set");
    assert!(ai_error.contains("connection refused"));
    assert_eq!(score.metadata["provider"], "heuristic");
}

#[tokio::test(start_paused = true)]
async fn hanging_provider_loses_the_race() {
    let orchestrator = orchestrator_with(vec![StubAdapter::new(
        ProviderKind::Gemini,
        Behavior::Hang,
    )]);

    let started = tokio::time::Instant::now();
    let score = orchestrator
        .score(&writing_request())
        .await
        .expect("fallback result, not an error");

    // The caller waits for the 500ms budget, not the hour-long hang.
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_valid(&score);
    let ai_error = score.metadata["ai_error"].as_str().expect("ai_error set");
    assert!(ai_error.contains("timed out after 500ms"));
}

#[tokio::test]
async fn agreeing_providers_merge_per_dimension() {
    let first = StubAdapter::new(
        ProviderKind::OpenAi,
        Behavior::Judgment(
            r#"{"content": 80, "structure": 70, "coherence": 70, "grammar": 75,
               "vocabulary": 72, "spelling": 85, "overall": 76, "rationale": "well organised"}"#,
        ),
    );
    let second = StubAdapter::new(
        ProviderKind::DeepSeek,
        Behavior::Judgment(
            r#"{"content": 90, "structure": 70, "coherence": 70, "grammar": 75,
               "vocabulary": 72, "spelling": 85, "overall": 78, "rationale": "strong arguments"}"#,
        ),
    );

    let orchestrator = orchestrator_with(vec![first, second]);
    let score = orchestrator.score(&writing_request()).await.expect("scored");

    assert_valid(&score);
    assert_eq!(score.subscores[&bandscore_core::Dimension::Content], 85);
    assert!(!score.metadata.contains_key("ai_error"));
    let rationale = score.rationale.expect("rationale");
    assert!(rationale.contains("well organised"));
    assert!(rationale.contains("strong arguments"));
}

#[tokio::test]
async fn partial_provider_failure_still_merges() {
    let good = StubAdapter::new(
        ProviderKind::OpenAi,
        Behavior::Judgment(r#"{"content": 66, "grammar": 60, "overall": 63}"#),
    );
    let bad = StubAdapter::new(ProviderKind::Gemini, Behavior::Fail);

    let orchestrator = orchestrator_with(vec![good, bad]);
    let score = orchestrator.score(&writing_request()).await.expect("scored");

    assert_eq!(score.subscores[&bandscore_core::Dimension::Content], 66);
    let ai_error = score.metadata["ai_error"].as_str().expect("ai_error set");
    assert!(ai_error.contains("gemini"));
}

#[tokio::test]
async fn unparseable_judgment_degrades_to_fallback() {
    let orchestrator = orchestrator_with(vec![StubAdapter::new(
        ProviderKind::OpenAi,
        Behavior::Judgment("I would rather not assign numbers to this."),
    )]);

    let score = orchestrator.score(&writing_request()).await.expect("scored");
    assert_valid(&score);
    assert_eq!(score.metadata["provider"], "heuristic");
}

#[tokio::test]
async fn reading_multi_select_scores_with_no_backend() {
    let orchestrator = ScoreOrchestrator::from_config(EngineConfig::default());
    let request = ScoringRequest {
        section: Section::Reading,
        question_type: "multiple_choice_multiple".to_string(),
        payload: SectionPayload::MultiChoice {
            selected: vec!["A".to_string(), "C".to_string()],
            correct: vec!["A".to_string(), "C".to_string(), "D".to_string()],
        },
        include_rationale: true,
        timeout_ms: None,
    };

    let score = orchestrator.score(&request).await.expect("scored");
    // 2 of 3 recall with no false positives: ratio ~0.667.
    assert!(score.overall > 0 && score.overall < 90);
    assert_eq!(score.overall, 60);
}

#[tokio::test]
async fn reading_rationale_enrichment_keeps_deterministic_numbers() {
    let explainer = StubAdapter::new(
        ProviderKind::OpenAi,
        Behavior::Judgment(r#"{"rationale": "Option D was part of the key but was not selected."}"#),
    );
    let orchestrator = orchestrator_with(vec![explainer]);
    let request = ScoringRequest {
        section: Section::Reading,
        question_type: "multiple_choice_multiple".to_string(),
        payload: SectionPayload::MultiChoice {
            selected: vec!["A".to_string(), "C".to_string()],
            correct: vec!["A".to_string(), "C".to_string(), "D".to_string()],
        },
        include_rationale: true,
        timeout_ms: Some(500),
    };

    let score = orchestrator.score(&request).await.expect("scored");
    assert_eq!(score.overall, 60);
    let rationale = score.rationale.expect("rationale");
    assert!(rationale.contains("Option D"));
}

#[tokio::test]
async fn reading_enrichment_failure_never_degrades_the_grade() {
    let orchestrator = orchestrator_with(vec![StubAdapter::new(
        ProviderKind::OpenAi,
        Behavior::Fail,
    )]);
    let request = ScoringRequest {
        section: Section::Listening,
        question_type: "write_from_dictation".to_string(),
        payload: SectionPayload::Dictation {
            target_text: "the cat sat on the mat".to_string(),
            user_text: "the cat sat on the mat".to_string(),
        },
        include_rationale: true,
        timeout_ms: Some(500),
    };

    let score = orchestrator.score(&request).await.expect("scored");
    assert_eq!(score.overall, 90);
    assert!(score.metadata.contains_key("ai_error"));
}

#[tokio::test]
async fn structurally_invalid_request_is_the_only_error() {
    let orchestrator = ScoreOrchestrator::from_config(EngineConfig::default());
    let request = ScoringRequest {
        section: Section::Reading,
        question_type: "multiple_choice_single".to_string(),
        payload: SectionPayload::Speaking {
            transcript: "hello".to_string(),
            reference_text: None,
            audio_ref: None,
        },
        include_rationale: true,
        timeout_ms: None,
    };

    assert!(matches!(
        orchestrator.score(&request).await,
        Err(ScoreError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn wire_format_request_round_trips() {
    let json = r#"{
        "section": "listening",
        "question_type": "write_from_dictation",
        "payload": {
            "kind": "dictation",
            "target_text": "They canceled the afternoon lecture.",
            "user_text": "they cancelled the afternoon lecture"
        }
    }"#;
    let request: ScoringRequest = serde_json::from_str(json).expect("request parses");

    let orchestrator = ScoreOrchestrator::from_config(EngineConfig::default());
    let score = orchestrator.score(&request).await.expect("scored");

    // One substitution (canceled/cancelled) in a 5-word sentence.
    assert!(score.overall > 60 && score.overall < 90);
    let serialized = serde_json::to_value(&score).expect("result serializes");
    assert!(serialized["overall"].is_u64());
}
