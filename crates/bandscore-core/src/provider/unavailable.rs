//! Null-object adapter used when no judgment backend is configured.
//!
//! Keeps the orchestrator's provider list non-empty so the selection
//! and fallback paths stay uniform: every call fails fast with
//! `ProviderError::Unavailable` and the heuristic path takes over.

use crate::domain::{ProviderKind, RawProviderResult};
use crate::provider::{
    ExplainTask, JudgeOptions, ProviderAdapter, ProviderError, ProviderHealth, SpeakingTask,
    WritingTask,
};

#[derive(Debug, Default)]
pub struct UnavailableAdapter;

impl UnavailableAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for UnavailableAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Unavailable
    }

    async fn health(&self) -> ProviderHealth {
        ProviderHealth::failed("no judgment backend configured")
    }

    async fn score_speaking(
        &self,
        _task: &SpeakingTask,
        _opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        Err(ProviderError::Unavailable(ProviderKind::Unavailable))
    }

    async fn score_writing(
        &self,
        _task: &WritingTask,
        _opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        Err(ProviderError::Unavailable(ProviderKind::Unavailable))
    }

    async fn explain_reading(
        &self,
        _task: &ExplainTask,
        _opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        Err(ProviderError::Unavailable(ProviderKind::Unavailable))
    }

    async fn explain_listening(
        &self,
        _task: &ExplainTask,
        _opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        Err(ProviderError::Unavailable(ProviderKind::Unavailable))
    }
}
