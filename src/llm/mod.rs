//! Chat client for OpenAI-compatible backends.
//!
//! `maas`, `openai`, and `vllm` records all speak the same
//! chat-completions protocol; `azure_openai` differs only in auth and
//! request path, so a single client covers all four tags.

pub mod openai;
pub mod rate_limit;

pub use openai::OpenAiClient;
pub use rate_limit::RateLimiter;

use crate::config::llm::LlmConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_SYSTEM_PROMPT: &str = "you are a helpful assistant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Issue a chat request and return the assistant's content.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Wrap a bare prompt in the default system/user message pair.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let messages = [
            ChatMessage::system(DEFAULT_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];
        self.chat(&messages).await
    }
}

/// Construct a client for the backend an LLM record selects.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    Ok(Arc::new(OpenAiClient::new(config.clone())?))
}
