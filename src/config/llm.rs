use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_api_key() -> String {
    // Local inference servers accept any bearer token.
    "dummy".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_rate() -> f64 {
    1000.0
}

fn default_time_period() -> f64 {
    1.0
}

/// Backend selector for an LLM record.
///
/// `maas` and `vllm` endpoints speak the same chat-completions protocol
/// as `openai`; the tag is kept so documents round-trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmProvider {
    #[serde(rename = "maas")]
    Maas,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "vllm")]
    Vllm,
    #[serde(rename = "azure_openai")]
    AzureOpenAi,
}

impl LlmProvider {
    pub const KNOWN_TAGS: &'static [&'static str] = &["maas", "openai", "vllm", "azure_openai"];

    #[must_use]
    pub fn is_azure(&self) -> bool {
        matches!(self, LlmProvider::AzureOpenAi)
    }
}

/// Connection parameters for a language-model backend.
///
/// Declared once at the top level as `chat_llm` and reused (via YAML
/// anchors or by omission) across planners, executors, and generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "type")]
    pub provider: LlmProvider,

    #[serde(default = "default_api_key")]
    pub api_key: String,

    pub base_url: String,

    pub model: String,

    /// Accepted for compatibility; requests are issued non-streaming and
    /// the accumulated content is identical.
    #[serde(default)]
    pub stream: bool,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Per-request timeout (e.g. "90s"). None means no timeout.
    #[serde(default, with = "humantime_serde::option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Requests allowed per `time_period` seconds.
    #[serde(default = "default_max_rate")]
    pub max_rate: f64,

    #[serde(default = "default_time_period")]
    pub time_period: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Azure only (e.g. "2024-12-01-preview").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Azure only; deployment name inserted into the request path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_deployment: Option<String>,
}

impl LlmConfig {
    /// Copy with the API key masked, for display output.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if !cfg.api_key.is_empty() {
            cfg.api_key = "***".to_string();
        }
        cfg
    }
}
