//! Engine configuration, read once from the environment.
//!
//! Read-only after initialization: the orchestrator takes a snapshot at
//! construction and never consults ambient state again, so scoring
//! calls stay pure and re-entrant.

use std::env;

use crate::domain::ProviderKind;

/// Default per-call timeout budget for provider calls.
pub const DEFAULT_TIMEOUT_MS: u64 = 8_000;

/// Environment variable overriding the default timeout.
pub const TIMEOUT_ENV_VAR: &str = "BANDSCORE_AI_TIMEOUT_MS";

/// Credentials and addressing for one judgment backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    /// Override of the backend's default base URL (proxies, self-hosted
    /// compatible endpoints).
    pub base_url: Option<String>,
    pub model: String,
}

/// Process-wide engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Per-call timeout applied to every provider invocation unless the
    /// request overrides it.
    pub timeout_ms: u64,

    /// Backends available to the orchestrator, in precedence order.
    /// A backend is configured iff its API key is present.
    pub providers: Vec<ProviderConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            providers: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Self {
        let timeout_ms = parse_timeout_ms(env::var(TIMEOUT_ENV_VAR).ok().as_deref());

        let mut providers = Vec::new();
        if let Some(api_key) = non_empty(env::var("OPENAI_API_KEY").ok()) {
            providers.push(ProviderConfig {
                kind: ProviderKind::OpenAi,
                api_key,
                base_url: non_empty(env::var("OPENAI_BASE_URL").ok()),
                model: non_empty(env::var("OPENAI_MODEL").ok())
                    .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            });
        }
        if let Some(api_key) = non_empty(env::var("DEEPSEEK_API_KEY").ok()) {
            providers.push(ProviderConfig {
                kind: ProviderKind::DeepSeek,
                api_key,
                base_url: non_empty(env::var("DEEPSEEK_BASE_URL").ok()),
                model: non_empty(env::var("DEEPSEEK_MODEL").ok())
                    .unwrap_or_else(|| "deepseek-chat".to_string()),
            });
        }
        if let Some(api_key) = non_empty(env::var("GEMINI_API_KEY").ok()) {
            providers.push(ProviderConfig {
                kind: ProviderKind::Gemini,
                api_key,
                base_url: None,
                model: non_empty(env::var("GEMINI_MODEL").ok())
                    .unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            });
        }

        Self {
            timeout_ms,
            providers,
        }
    }

    /// Override the timeout; non-positive values are ignored.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        if timeout_ms > 0 {
            self.timeout_ms = timeout_ms;
        }
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Absent, unparseable, or non-positive values fall back to the default.
fn parse_timeout_ms(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .map(|value| value as u64)
        .unwrap_or(DEFAULT_TIMEOUT_MS)
}
