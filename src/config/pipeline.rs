use super::llm::LlmConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_max_iterations() -> u32 {
    10
}

/// A solver pipeline: a planner, an ordered list of executors, and a
/// generator, each selected by a `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(rename = "type")]
    pub kind: String,

    pub planner: PlannerConfig,

    /// Executors in declaration order; the planner routes tasks to them
    /// by tag.
    pub executors: Vec<ExecutorConfig>,

    pub generator: GeneratorConfig,

    /// Upper bound on plan/execute rounds (iterative pipelines only).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_prompt: Option<PromptSelector>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite_prompt: Option<PromptSelector>,
}

/// Selects a named prompt template from the built-in table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSelector {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,

    /// Executor-specific settings (e.g. `top_k` for retrieval). Kept as
    /// raw values so tags this binary does not implement still parse.
    #[serde(flatten)]
    pub params: HashMap<String, serde_yaml::Value>,
}

impl ExecutorConfig {
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(serde_yaml::Value::as_u64)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(serde_yaml::Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_prompt: Option<PromptSelector>,
}

impl PipelineConfig {
    /// Fill in every omitted `llm` record from the shared default.
    ///
    /// Documents typically reuse the top-level `chat_llm` through YAML
    /// anchors; omitting the key entirely means the same thing.
    pub fn resolve_llm(&mut self, default: &LlmConfig) {
        if self.planner.llm.is_none() {
            self.planner.llm = Some(default.clone());
        }
        for executor in &mut self.executors {
            if executor.llm.is_none() {
                executor.llm = Some(default.clone());
            }
        }
        if self.generator.llm.is_none() {
            self.generator.llm = Some(default.clone());
        }
    }
}
