use super::{prompts, Executor, Memory, Reference, Task, TaskResult};
use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use crate::llm::LlmClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const RETRIEVAL_TAG: &str = "retrieval_executor";
pub const MATH_TAG: &str = "math_executor";
pub const DEDUCE_TAG: &str = "deduce_executor";

const DEFAULT_TOP_K: u64 = 5;

/// Fetches evidence chunks from the project's knowledge server.
pub struct RetrievalExecutor {
    client: reqwest::Client,
    host_addr: String,
    namespace: String,
    top_k: u64,
}

#[derive(Debug, Serialize)]
struct RetrieveRequest<'a> {
    query: &'a str,
    namespace: &'a str,
    top_k: u64,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    chunks: Vec<Chunk>,
}

#[derive(Debug, Deserialize)]
struct Chunk {
    id: String,
    content: String,
    #[serde(default)]
    score: f64,
}

impl RetrievalExecutor {
    pub fn new(project: &ProjectConfig, top_k: Option<u64>) -> Self {
        Self {
            client: reqwest::Client::new(),
            host_addr: project.host_addr.trim_end_matches('/').to_string(),
            namespace: project.namespace.clone(),
            top_k: top_k.unwrap_or(DEFAULT_TOP_K),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/retrieve", self.host_addr)
    }
}

#[async_trait]
impl Executor for RetrievalExecutor {
    fn tag(&self) -> &'static str {
        RETRIEVAL_TAG
    }

    async fn execute(&self, task: &Task, _memory: &Memory) -> Result<TaskResult> {
        let request = RetrieveRequest {
            query: &task.query,
            namespace: &self.namespace,
            top_k: self.top_k,
        };
        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Executor(format!(
                "retrieval request failed with {status}"
            )));
        }

        let parsed: RetrieveResponse = response.json().await?;
        debug!(
            "retrieved {} chunks for '{}' from {}",
            parsed.chunks.len(),
            task.query,
            self.namespace
        );

        let references: Vec<Reference> = parsed
            .chunks
            .into_iter()
            .map(|c| Reference {
                id: c.id,
                content: c.content,
                score: c.score,
            })
            .collect();
        let output = references
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(TaskResult::new(task, output).with_references(references))
    }
}

/// Answers numeric sub-questions with the configured LLM.
pub struct MathExecutor {
    llm: Arc<dyn LlmClient>,
}

impl MathExecutor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Executor for MathExecutor {
    fn tag(&self) -> &'static str {
        MATH_TAG
    }

    async fn execute(&self, task: &Task, memory: &Memory) -> Result<TaskResult> {
        let output = prompt_with_memory(&*self.llm, prompts::MATH, task, memory).await?;
        Ok(TaskResult::new(task, output))
    }
}

/// Draws conclusions from previously gathered evidence with the
/// configured LLM.
pub struct DeduceExecutor {
    llm: Arc<dyn LlmClient>,
}

impl DeduceExecutor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Executor for DeduceExecutor {
    fn tag(&self) -> &'static str {
        DEDUCE_TAG
    }

    async fn execute(&self, task: &Task, memory: &Memory) -> Result<TaskResult> {
        let output = prompt_with_memory(&*self.llm, prompts::DEDUCE, task, memory).await?;
        Ok(TaskResult::new(task, output))
    }
}

async fn prompt_with_memory(
    llm: &dyn LlmClient,
    template_tag: &str,
    task: &Task,
    memory: &Memory,
) -> Result<String> {
    let template = prompts::lookup(template_tag)
        .ok_or_else(|| Error::UnknownTag(format!("prompt template '{template_tag}'")))?;
    let transcript = if memory.is_empty() {
        "(none)".to_string()
    } else {
        memory.transcript()
    };
    let prompt = prompts::render(
        template,
        &[("memory", &transcript), ("query", &task.query)],
    );
    llm.complete(&prompt).await
}
