use serde::{Deserialize, Deserializer, Serialize};

pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod validator;

pub use llm::{LlmConfig, LlmProvider};
pub use loader::ConfigLoader;
pub use pipeline::{
    ExecutorConfig, GeneratorConfig, PipelineConfig, PlannerConfig, PromptSelector,
};
pub use validator::{ConfigValidator, ValidationResult};

/// Environment variables are process-global, so every test that sets or
/// reads `SOLVEKIT_*` holds this lock.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn default_log_level() -> String {
    "info".to_string()
}

fn default_biz_scene() -> String {
    "default".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

/// Project ids are written both quoted and bare in the wild.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Root of the YAML document.
///
/// `chat_llm` is the shared backend, reused by reference throughout the
/// pipeline sections; `project` points at the knowledge-server deployment
/// the retrieval executor talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveConfig {
    pub chat_llm: LlmConfig,

    #[serde(default)]
    pub log: LogConfig,

    pub project: ProjectConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterative_solver_pipeline: Option<PipelineConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_solver_pipeline: Option<PipelineConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Deployment metadata for the backing knowledge server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_biz_scene")]
    pub biz_scene: String,

    /// Base address of the retrieval/graph server.
    pub host_addr: String,

    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default = "default_language")]
    pub language: String,

    pub namespace: String,
}

impl SolveConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Environment variables override the file, so deployments can keep
    /// secrets out of checked-in configs.
    pub fn merge_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var("SOLVEKIT_API_KEY") {
            self.chat_llm.api_key = api_key;
        }

        if let Ok(base_url) = std::env::var("SOLVEKIT_BASE_URL") {
            self.chat_llm.base_url = base_url;
        }

        if let Ok(log_level) = std::env::var("SOLVEKIT_LOG_LEVEL") {
            self.log.level = log_level;
        }

        if let Ok(host_addr) = std::env::var("SOLVEKIT_HOST_ADDR") {
            self.project.host_addr = host_addr;
        }
    }

    /// Propagate the shared `chat_llm` into every pipeline component
    /// that did not declare its own backend.
    pub fn resolve(&mut self) {
        let default = self.chat_llm.clone();
        if let Some(pipeline) = &mut self.iterative_solver_pipeline {
            pipeline.resolve_llm(&default);
        }
        if let Some(pipeline) = &mut self.static_solver_pipeline {
            pipeline.resolve_llm(&default);
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log.level
    }

    /// Copy with every API key masked, for display output.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        cfg.chat_llm = cfg.chat_llm.redacted();
        for pipeline in [
            &mut cfg.iterative_solver_pipeline,
            &mut cfg.static_solver_pipeline,
        ]
        .into_iter()
        .flatten()
        {
            if let Some(llm) = &mut pipeline.planner.llm {
                *llm = llm.redacted();
            }
            for executor in &mut pipeline.executors {
                if let Some(llm) = &mut executor.llm {
                    *llm = llm.redacted();
                }
            }
            if let Some(llm) = &mut pipeline.generator.llm {
                *llm = llm.redacted();
            }
        }
        cfg
    }
}
