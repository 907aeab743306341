//! OpenAI-compatible chat-completions adapter.
//!
//! Serves both the openai and deepseek backends; they share the wire
//! protocol and differ only in base URL, model, and reported kind.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::ProviderConfig;
use crate::domain::{ProviderKind, ProviderMeta, RawProviderResult, Section};
use crate::provider::{
    parse_judgment, ExplainTask, JudgeOptions, ProviderAdapter, ProviderError, ProviderHealth,
    SpeakingTask, WritingTask,
};
use crate::rubric::{self, ExplainContext, JudgeContext, PromptPair};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
const HEALTH_TIMEOUT_MS: u64 = 3_000;

pub struct OpenAiCompatAdapter {
    kind: ProviderKind,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatAdapter {
    pub fn openai(config: &ProviderConfig) -> Self {
        Self::new(ProviderKind::OpenAi, config, OPENAI_BASE_URL)
    }

    pub fn deepseek(config: &ProviderConfig) -> Self {
        Self::new(ProviderKind::DeepSeek, config, DEEPSEEK_BASE_URL)
    }

    fn new(kind: ProviderKind, config: &ProviderConfig, default_base_url: &str) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url.to_string());
        Self {
            kind,
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn judge(
        &self,
        prompt: PromptPair,
        opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        let started = Instant::now();

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "temperature": 0.0,
            "max_tokens": opts.max_tokens,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_millis(opts.timeout_ms))
            .json(&body)
            .send()
            .await
            .map_err(|err| classify(err, opts.timeout_ms))?
            .error_for_status()
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|err| classify(err, opts.timeout_ms))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();
        let latency_ms = started.elapsed().as_millis() as u64;
        debug!(
            event = "provider.judged",
            provider = %self.kind,
            model = %self.model,
            latency_ms,
        );

        let mut meta = ProviderMeta::new(self.kind)
            .with_model(self.model.clone())
            .with_latency_ms(latency_ms);
        if let Some(finish_reason) = payload["choices"][0]["finish_reason"].as_str() {
            meta = meta.with_finish_reason(finish_reason);
        }

        Ok(parse_judgment(content, meta))
    }
}

fn classify(err: reqwest::Error, timeout_ms: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout { timeout_ms }
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Keep only the rationale: the deterministic result owns the numbers.
fn rationale_only(mut raw: RawProviderResult) -> RawProviderResult {
    raw.overall = None;
    raw.subscores.clear();
    raw
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiCompatAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn health(&self) -> ProviderHealth {
        let started = Instant::now();
        let probe = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_millis(HEALTH_TIMEOUT_MS))
            .send()
            .await;
        match probe.and_then(|response| response.error_for_status()) {
            Ok(_) => ProviderHealth::healthy(
                started.elapsed().as_millis() as u64,
                self.model.clone(),
            ),
            Err(err) => ProviderHealth::failed(err.to_string()),
        }
    }

    async fn score_speaking(
        &self,
        task: &SpeakingTask,
        opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        let prompt = rubric::build_prompt(
            Section::Speaking,
            &JudgeContext {
                task_label: &task.task_label,
                response: &task.transcript,
                reference: task.reference_text.as_deref(),
                include_rationale: opts.include_rationale,
            },
        );
        self.judge(prompt, opts).await
    }

    async fn score_writing(
        &self,
        task: &WritingTask,
        opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        let prompt = rubric::build_prompt(
            Section::Writing,
            &JudgeContext {
                task_label: &task.task_label,
                response: &task.text,
                reference: task.prompt.as_deref(),
                include_rationale: opts.include_rationale,
            },
        );
        self.judge(prompt, opts).await
    }

    async fn explain_reading(
        &self,
        task: &ExplainTask,
        opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        let prompt = rubric::build_explain_prompt(
            Section::Reading,
            &ExplainContext {
                task_label: &task.task_label,
                summary: &task.summary,
            },
        );
        self.judge(prompt, opts).await.map(rationale_only)
    }

    async fn explain_listening(
        &self,
        task: &ExplainTask,
        opts: &JudgeOptions,
    ) -> Result<RawProviderResult, ProviderError> {
        let prompt = rubric::build_explain_prompt(
            Section::Listening,
            &ExplainContext {
                task_label: &task.task_label,
                summary: &task.summary,
            },
        );
        self.judge(prompt, opts).await.map(rationale_only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: ProviderKind) -> ProviderConfig {
        ProviderConfig {
            kind,
            api_key: "test-key".to_string(),
            base_url: None,
            model: "test-model".to_string(),
        }
    }

    #[test]
    fn test_backend_defaults() {
        let openai = OpenAiCompatAdapter::openai(&config(ProviderKind::OpenAi));
        assert_eq!(openai.kind(), ProviderKind::OpenAi);
        assert_eq!(openai.base_url, OPENAI_BASE_URL);

        let deepseek = OpenAiCompatAdapter::deepseek(&config(ProviderKind::DeepSeek));
        assert_eq!(deepseek.kind(), ProviderKind::DeepSeek);
        assert_eq!(deepseek.base_url, DEEPSEEK_BASE_URL);
    }

    #[test]
    fn test_base_url_override_strips_trailing_slash() {
        let mut cfg = config(ProviderKind::OpenAi);
        cfg.base_url = Some("https://proxy.internal/v1/".to_string());
        let adapter = OpenAiCompatAdapter::openai(&cfg);
        assert_eq!(adapter.base_url, "https://proxy.internal/v1");
    }

    #[test]
    fn test_rationale_only_strips_numeric_signal() {
        let mut raw = RawProviderResult::empty(ProviderMeta::new(ProviderKind::OpenAi));
        raw.overall = Some(80.0);
        raw.subscores.insert(crate::domain::Dimension::Content, 70.0);
        raw.rationale = Some("because".to_string());

        let stripped = rationale_only(raw);
        assert!(!stripped.has_signal());
        assert_eq!(stripped.rationale.as_deref(), Some("because"));
    }
}
