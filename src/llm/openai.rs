use super::rate_limit::RateLimiter;
use super::{ChatMessage, LlmClient};
use crate::config::llm::LlmConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, trace};

const DEFAULT_AZURE_API_VERSION: &str = "2024-12-01-preview";

/// Chat-completions client for OpenAI-compatible endpoints, including
/// Azure deployments.
pub struct OpenAiClient {
    config: LlmConfig,
    client: reqwest::Client,
    limiter: RateLimiter,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        let limiter = RateLimiter::new(config.max_rate, config.time_period);

        debug!(
            "LLM client for {} ({}) with rate limit {} every {}s",
            config.model, config.base_url, config.max_rate, config.time_period
        );

        Ok(Self {
            config,
            client,
            limiter,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> Result<String> {
        let base = self.config.base_url.trim_end_matches('/');
        if self.config.provider.is_azure() {
            let deployment = self.config.azure_deployment.as_deref().ok_or_else(|| {
                Error::Config("azure_openai requires 'azure_deployment'".to_string())
            })?;
            Ok(format!(
                "{base}/openai/deployments/{deployment}/chat/completions"
            ))
        } else {
            Ok(format!("{base}/chat/completions"))
        }
    }

    fn build_request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        self.limiter.acquire().await;

        let body = self.build_request_body(messages);
        trace!("chat request body: {body}");

        let mut request = self.client.post(self.endpoint()?).json(&body);
        if self.config.provider.is_azure() {
            let api_version = self
                .config
                .api_version
                .as_deref()
                .unwrap_or(DEFAULT_AZURE_API_VERSION);
            request = request
                .header("api-key", &self.config.api_key)
                .query(&[("api-version", api_version)]);
        } else {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!(
                "chat completion failed with {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        if let Some(usage) = &parsed.usage {
            debug!(
                "chat completion used {} prompt / {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Llm("response contained no choices".to_string()))?;
        choice
            .message
            .content
            .ok_or_else(|| Error::Llm("response message had no content".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(yaml: &str) -> OpenAiClient {
        let config: LlmConfig = serde_yaml::from_str(yaml).unwrap();
        OpenAiClient::new(config).unwrap()
    }

    #[test]
    fn test_endpoint_openai_compatible() {
        let client = client_for(
            "type: vllm\nbase_url: http://0.0.0.0:8000/v1/\nmodel: Qwen/Qwen3-0.6B\n",
        );
        assert_eq!(
            client.endpoint().unwrap(),
            "http://0.0.0.0:8000/v1/chat/completions"
        );
    }

    #[test]
    fn test_endpoint_azure_requires_deployment() {
        let client = client_for(
            "type: azure_openai\nbase_url: https://x.openai.azure.com\nmodel: gpt-4o\n",
        );
        assert!(client.endpoint().is_err());

        let client = client_for(
            "type: azure_openai\nbase_url: https://x.openai.azure.com\nmodel: gpt-4o\nazure_deployment: prod\n",
        );
        assert_eq!(
            client.endpoint().unwrap(),
            "https://x.openai.azure.com/openai/deployments/prod/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let client = client_for(
            "type: openai\nbase_url: u\nmodel: gpt-4o-mini\ntemperature: 0.2\nmax_tokens: 512\n",
        );
        let body = client.build_request_body(&[ChatMessage::user("hello")]);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_request_body_omits_unset_max_tokens() {
        let client = client_for("type: openai\nbase_url: u\nmodel: m\n");
        let body = client.build_request_body(&[ChatMessage::user("hello")]);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "42"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("42"));
        assert_eq!(parsed.usage.as_ref().unwrap().completion_tokens, 2);
    }
}
