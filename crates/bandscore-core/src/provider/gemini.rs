//! Google Gemini generateContent adapter.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::ProviderConfig;
use crate::domain::{ProviderKind, ProviderMeta, RawProviderResult, Section};
use crate::provider::{
    parse_judgment, ExplainTask, JudgeOptions, ProviderAdapter, ProviderError, ProviderHealth,
    SpeakingTask, WritingTask,
};
use crate::rubric::{self, ExplainContext, JudgeContext, PromptPair};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const HEALTH_TIMEOUT_MS: u64 = 3_000;

pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiAdapter {
    pub fn new(config: &ProviderConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| GEMINI_BASE_URL.to_string());
        Self {
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
            "systemInstruction": {"parts": [{"text": prompt.system}]},
            "contents": [{"role": "user", "parts": [{"text": prompt.user}]}],
            "generationConfig": {
                "temperature": 0.0,
                "maxOutputTokens": opts.max_tokens,
                "responseMimeType": "application/json",
            },
        });

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
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

        let content = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default();
        let latency_ms = started.elapsed().as_millis() as u64;
        debug!(
            event = "provider.judged",
            provider = %ProviderKind::Gemini,
            model = %self.model,
            latency_ms,
        );

        let mut meta = ProviderMeta::new(ProviderKind::Gemini)
            .with_model(self.model.clone())
            .with_latency_ms(latency_ms);
        if let Some(finish_reason) = payload["candidates"][0]["finishReason"].as_str() {
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

fn rationale_only(mut raw: RawProviderResult) -> RawProviderResult {
    raw.overall = None;
    raw.subscores.clear();
    raw
}

#[async_trait::async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn health(&self) -> ProviderHealth {
        let started = Instant::now();
        let probe = self
            .client
            .get(format!("{}/models/{}", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
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
