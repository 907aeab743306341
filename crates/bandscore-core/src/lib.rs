//! Bandscore Core Library
//!
//! Scoring orchestration and normalization engine: converts LLM
//! judgments, edit-distance metrics, and exact-match checks into the
//! canonical 0-90 scale.

pub mod config;
pub mod deterministic;
pub mod domain;
pub mod heuristic;
pub mod merge;
pub mod orchestrator;
pub mod provider;
pub mod rubric;
pub mod scale;
pub mod telemetry;

pub use domain::{
    CanonicalScore, Dimension, ProviderKind, ProviderMeta, QuestionKind, RawProviderResult,
    Result, ScoreError, ScoringRequest, Section, SectionPayload,
};

pub use config::{EngineConfig, ProviderConfig, DEFAULT_TIMEOUT_MS};

pub use deterministic::{
    score_dictation, score_fill_blanks, score_multi_choice, score_payload, score_reorder,
    score_single_choice,
};

pub use merge::{combine_deterministic_and_llm, merge};

pub use orchestrator::ScoreOrchestrator;

pub use provider::{
    ExplainTask, GeminiAdapter, JudgeOptions, OpenAiCompatAdapter, ProviderAdapter, ProviderError,
    ProviderHealth, SpeakingTask, UnavailableAdapter, WritingTask,
};

pub use rubric::{
    build_explain_prompt, build_prompt, default_weights, ExplainContext, JudgeContext, PromptPair,
    RubricWeights,
};

pub use scale::{
    accuracy_to_canonical, clamp_canonical, edit_rate_to_canonical, rescale, weighted_average,
};

pub use telemetry::init_tracing;

/// Bandscore version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
