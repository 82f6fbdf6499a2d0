use super::{prompts, Generator, Memory};
use crate::config::pipeline::GeneratorConfig;
use crate::error::{Error, Result};
use crate::llm::LlmClient;
use async_trait::async_trait;
use std::sync::Arc;

pub const GENERATOR_TAG: &str = "llm_generator";

/// Writes the final answer from the solved sub-questions, citing
/// retrieved references by id.
pub struct LlmGenerator {
    llm: Arc<dyn LlmClient>,
    template: &'static str,
}

impl LlmGenerator {
    pub fn from_config(config: &GeneratorConfig, llm: Arc<dyn LlmClient>) -> Result<Self> {
        if config.kind != GENERATOR_TAG {
            return Err(Error::UnknownTag(format!("generator '{}'", config.kind)));
        }
        let kind = config
            .generated_prompt
            .as_ref()
            .map_or(prompts::REFER_GENERATOR, |s| s.kind.as_str());
        let template = prompts::lookup(kind)
            .ok_or_else(|| Error::UnknownTag(format!("prompt template '{kind}'")))?;
        Ok(Self { llm, template })
    }

    fn reference_block(memory: &Memory) -> String {
        let lines: Vec<String> = memory
            .references()
            .map(|r| format!("[{}] {}", r.id, r.content))
            .collect();
        if lines.is_empty() {
            "(none)".to_string()
        } else {
            lines.join("\n")
        }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, question: &str, memory: &Memory) -> Result<String> {
        let transcript = if memory.is_empty() {
            "(none)".to_string()
        } else {
            memory.transcript()
        };
        let prompt = prompts::render(
            self.template,
            &[
                ("question", question),
                ("memory", &transcript),
                ("references", &Self::reference_block(memory)),
            ],
        );
        self.llm.complete(&prompt).await
    }
}
