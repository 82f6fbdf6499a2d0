//! Structural checks over the raw YAML document.
//!
//! The typed model in this module's siblings rejects a bad document at
//! the first serde error; this validator walks the raw value instead so
//! `solvekit validate` can report every problem at once.

use crate::config::llm::LlmProvider;
use crate::pipeline::generator::GENERATOR_TAG;
use crate::pipeline::iterative::ITERATIVE_PIPELINE_TAG;
use crate::pipeline::planner::{ITERATIVE_PLANNER_TAG, STATIC_PLANNER_TAG};
use crate::pipeline::prompts;
use crate::pipeline::registry::ExecutorRegistry;
use crate::pipeline::static_plan::STATIC_PIPELINE_TAG;
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::fs;
use std::path::Path;

const PIPELINE_SECTIONS: [&str; 2] = ["iterative_solver_pipeline", "static_solver_pipeline"];
const TOP_LEVEL_KEYS: [&str; 5] = [
    "chat_llm",
    "log",
    "project",
    "iterative_solver_pipeline",
    "static_solver_pipeline",
];

pub struct ConfigValidator {
    executor_tags: Vec<&'static str>,
    strict: bool,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ConfigValidator {
    pub fn new(strict: bool) -> Self {
        Self {
            executor_tags: ExecutorRegistry::new().known_tags(),
            strict,
        }
    }

    pub fn validate_file(&self, path: &Path) -> Result<ValidationResult> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        self.validate_str(&content, &path.display().to_string())
    }

    pub fn validate_str(&self, content: &str, origin: &str) -> Result<ValidationResult> {
        let yaml: Value = serde_yaml::from_str(content)
            .with_context(|| format!("Failed to parse YAML: {origin}"))?;

        let mut issues = Vec::new();
        let mut suggestions = Vec::new();

        if let Value::Mapping(root) = &yaml {
            self.validate_root(root, &mut issues, &mut suggestions);
        } else {
            issues.push("Configuration root must be a mapping".to_string());
        }

        let is_valid = issues.is_empty();

        Ok(ValidationResult {
            is_valid,
            issues,
            suggestions,
        })
    }

    fn validate_root(
        &self,
        root: &serde_yaml::Mapping,
        issues: &mut Vec<String>,
        suggestions: &mut Vec<String>,
    ) {
        if let Some(Value::Mapping(llm)) = root.get("chat_llm") {
            self.validate_llm(llm, "chat_llm", issues);
        } else if root.contains_key("chat_llm") {
            issues.push("'chat_llm' must be a mapping".to_string());
        } else {
            issues.push("Missing required section 'chat_llm'".to_string());
        }

        if let Some(Value::Mapping(project)) = root.get("project") {
            for key in ["host_addr", "id", "namespace"] {
                if !project.contains_key(key) {
                    issues.push(format!("Project section missing required field '{key}'"));
                }
            }
        } else if root.contains_key("project") {
            issues.push("'project' must be a mapping".to_string());
        } else {
            issues.push("Missing required section 'project'".to_string());
        }

        if root.contains_key("chain") {
            issues.push("Error: 'chain' composition is no longer supported".to_string());
            suggestions.push(
                "Declare pipelines directly under 'iterative_solver_pipeline' or 'static_solver_pipeline'"
                    .to_string(),
            );
        }

        if !PIPELINE_SECTIONS.iter().any(|key| root.contains_key(key)) {
            issues.push(format!(
                "At least one pipeline section is required ({})",
                PIPELINE_SECTIONS.join(" or ")
            ));
        }

        for section in PIPELINE_SECTIONS {
            if let Some(value) = root.get(section) {
                if let Value::Mapping(pipeline) = value {
                    self.validate_pipeline(pipeline, section, issues, suggestions);
                } else {
                    issues.push(format!("'{section}' must be a mapping"));
                }
            }
        }

        if self.strict {
            for (key, _) in root.iter() {
                if let Value::String(key) = key {
                    if !TOP_LEVEL_KEYS.contains(&key.as_str()) && key != "chain" {
                        issues.push(format!("Unknown top-level key '{key}'"));
                    }
                }
            }
        }
    }

    fn validate_pipeline(
        &self,
        pipeline: &serde_yaml::Mapping,
        section: &str,
        issues: &mut Vec<String>,
        suggestions: &mut Vec<String>,
    ) {
        match pipeline.get("type") {
            Some(Value::String(kind)) => {
                if kind != ITERATIVE_PIPELINE_TAG && kind != STATIC_PIPELINE_TAG {
                    issues.push(format!("{section}: unknown pipeline type '{kind}'"));
                }
            }
            Some(_) => issues.push(format!("{section}: 'type' must be a string")),
            None => issues.push(format!("{section}: missing required field 'type'")),
        }

        if let Some(Value::Mapping(planner)) = pipeline.get("planner") {
            match planner.get("type") {
                Some(Value::String(kind)) => {
                    if kind != ITERATIVE_PLANNER_TAG && kind != STATIC_PLANNER_TAG {
                        issues.push(format!("{section}: unknown planner type '{kind}'"));
                    }
                }
                _ => issues.push(format!("{section}: planner missing required field 'type'")),
            }
            self.check_component(planner, section, "planner", issues, suggestions);
            for prompt_key in ["plan_prompt", "rewrite_prompt"] {
                self.check_prompt_selector(planner, section, prompt_key, issues);
            }
        } else {
            issues.push(format!("{section}: missing required 'planner' section"));
        }

        match pipeline.get("executors") {
            Some(Value::Sequence(executors)) => {
                if executors.is_empty() {
                    issues.push(format!("{section}: 'executors' has no entries"));
                }
                for (idx, executor) in executors.iter().enumerate() {
                    if let Value::Mapping(executor) = executor {
                        match executor.get("type") {
                            Some(Value::String(kind)) => {
                                if !self.executor_tags.contains(&kind.as_str()) {
                                    issues.push(format!(
                                        "{section}: executor {} has unknown type '{kind}'",
                                        idx + 1
                                    ));
                                }
                            }
                            _ => issues.push(format!(
                                "{section}: executor {} missing required field 'type'",
                                idx + 1
                            )),
                        }
                        self.check_component(
                            executor,
                            section,
                            &format!("executor {}", idx + 1),
                            issues,
                            suggestions,
                        );
                    } else {
                        issues.push(format!(
                            "{section}: executor {} is not a valid mapping",
                            idx + 1
                        ));
                    }
                }
            }
            Some(_) => issues.push(format!("{section}: 'executors' must be a sequence")),
            None => issues.push(format!("{section}: missing required 'executors' list")),
        }

        if let Some(Value::Mapping(generator)) = pipeline.get("generator") {
            match generator.get("type") {
                Some(Value::String(kind)) => {
                    if kind != GENERATOR_TAG {
                        issues.push(format!("{section}: unknown generator type '{kind}'"));
                    }
                }
                _ => issues.push(format!("{section}: generator missing required field 'type'")),
            }
            self.check_component(generator, section, "generator", issues, suggestions);
            self.check_prompt_selector(generator, section, "generated_prompt", issues);
        } else {
            issues.push(format!("{section}: missing required 'generator' section"));
        }
    }

    /// Checks shared by planner/executor/generator records: the renamed
    /// `llm_client` key and the shape of an inline `llm` record.
    fn check_component(
        &self,
        component: &serde_yaml::Mapping,
        section: &str,
        role: &str,
        issues: &mut Vec<String>,
        suggestions: &mut Vec<String>,
    ) {
        if component.contains_key("llm_client") {
            issues.push(format!(
                "Error: Deprecated parameter 'llm_client' in {section} {role} is no longer supported"
            ));
            suggestions.push(format!("Rename 'llm_client' to 'llm' in {section} {role}"));
        }

        if let Some(value) = component.get("llm") {
            if let Value::Mapping(llm) = value {
                self.validate_llm(llm, &format!("{section} {role} llm"), issues);
            } else {
                issues.push(format!("{section}: {role} 'llm' must be a mapping"));
            }
        }
    }

    fn validate_llm(&self, llm: &serde_yaml::Mapping, location: &str, issues: &mut Vec<String>) {
        match llm.get("type") {
            Some(Value::String(kind)) => {
                if !LlmProvider::KNOWN_TAGS.contains(&kind.as_str()) {
                    issues.push(format!("{location}: unknown LLM type '{kind}'"));
                }
            }
            _ => issues.push(format!("{location}: missing required field 'type'")),
        }
        for key in ["base_url", "model"] {
            if !llm.contains_key(key) {
                issues.push(format!("{location}: missing required field '{key}'"));
            }
        }
    }

    fn check_prompt_selector(
        &self,
        component: &serde_yaml::Mapping,
        section: &str,
        key: &str,
        issues: &mut Vec<String>,
    ) {
        if let Some(value) = component.get(key) {
            if let Value::Mapping(selector) = value {
                match selector.get("type") {
                    Some(Value::String(kind)) => {
                        if self.strict && prompts::lookup(kind).is_none() {
                            issues.push(format!(
                                "{section}: '{key}' selects unknown template '{kind}' (built-in: {})",
                                prompts::known_tags().join(", ")
                            ));
                        }
                    }
                    _ => issues.push(format!("{section}: '{key}' missing required field 'type'")),
                }
            } else {
                issues.push(format!("{section}: '{key}' must be a mapping"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    fn create_temp_yaml(content: &str) -> Result<NamedTempFile> {
        let temp_file = NamedTempFile::new()?;
        fs::write(temp_file.path(), content)?;
        Ok(temp_file)
    }

    const VALID: &str = r#"
chat_llm: &chat_llm
  type: maas
  api_key: key
  base_url: https://api.deepseek.com
  model: deepseek-chat

project:
  biz_scene: default
  host_addr: http://127.0.0.1:8887
  id: "1"
  language: en
  namespace: TwoWiki

iterative_solver_pipeline:
  type: iterative_pipeline
  planner:
    type: iterative_planner
    llm: *chat_llm
    plan_prompt:
      type: default_iterative_planning
  executors:
    - type: retrieval_executor
    - type: math_executor
      llm: *chat_llm
  generator:
    type: llm_generator
    generated_prompt:
      type: default_refer_generator
"#;

    #[test]
    fn test_valid_document() -> Result<()> {
        let validator = ConfigValidator::new(true);
        let temp_file = create_temp_yaml(VALID)?;
        let result = validator.validate_file(temp_file.path())?;

        assert!(result.is_valid, "unexpected issues: {:?}", result.issues);
        assert!(result.issues.is_empty());

        Ok(())
    }

    #[test]
    fn test_missing_chat_llm() -> Result<()> {
        let validator = ConfigValidator::new(false);
        let yaml = r#"
project:
  host_addr: http://127.0.0.1:8887
  id: "1"
  namespace: Test
static_solver_pipeline:
  type: static_pipeline
  planner:
    type: static_planner
  executors:
    - type: retrieval_executor
  generator:
    type: llm_generator
"#;
        let result = validator.validate_str(yaml, "inline")?;

        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("Missing required section 'chat_llm'")));

        Ok(())
    }

    #[test]
    fn test_no_pipeline_section() -> Result<()> {
        let validator = ConfigValidator::new(false);
        let yaml = r#"
chat_llm:
  type: openai
  base_url: u
  model: m
project:
  host_addr: h
  id: "1"
  namespace: n
"#;
        let result = validator.validate_str(yaml, "inline")?;

        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("At least one pipeline section is required")));

        Ok(())
    }

    #[test]
    fn test_empty_executors() -> Result<()> {
        let validator = ConfigValidator::new(false);
        let yaml = VALID.replace(
            "  executors:\n    - type: retrieval_executor\n    - type: math_executor\n      llm: *chat_llm\n",
            "  executors: []\n",
        );
        let result = validator.validate_str(&yaml, "inline")?;

        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("'executors' has no entries")));

        Ok(())
    }

    #[test]
    fn test_unknown_executor_type() -> Result<()> {
        let validator = ConfigValidator::new(false);
        let yaml = VALID.replace("type: math_executor", "type: quantum_executor");
        let result = validator.validate_str(&yaml, "inline")?;

        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("executor 2 has unknown type 'quantum_executor'")));

        Ok(())
    }

    #[test]
    fn test_executor_without_type() -> Result<()> {
        let validator = ConfigValidator::new(false);
        let yaml = VALID.replace("- type: retrieval_executor", "- top_k: 5");
        let result = validator.validate_str(&yaml, "inline")?;

        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("executor 1 missing required field 'type'")));

        Ok(())
    }

    #[test]
    fn test_deprecated_llm_client() -> Result<()> {
        let validator = ConfigValidator::new(false);
        let yaml = VALID.replace("    llm: *chat_llm\n    plan_prompt:", "    llm_client: *chat_llm\n    plan_prompt:");
        let result = validator.validate_str(&yaml, "inline")?;

        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("Deprecated parameter 'llm_client'")));
        assert!(result
            .suggestions
            .iter()
            .any(|s| s.contains("Rename 'llm_client' to 'llm'")));

        Ok(())
    }

    #[test]
    fn test_deprecated_chain() -> Result<()> {
        let validator = ConfigValidator::new(false);
        let yaml = format!("{VALID}\nchain:\n  - solver\n");
        let result = validator.validate_str(&yaml, "inline")?;

        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("'chain' composition is no longer supported")));
        assert!(result
            .suggestions
            .iter()
            .any(|s| s.contains("Declare pipelines directly")));

        Ok(())
    }

    #[test]
    fn test_llm_missing_model() -> Result<()> {
        let validator = ConfigValidator::new(false);
        let yaml = VALID.replace("  model: deepseek-chat\n", "");
        let result = validator.validate_str(&yaml, "inline")?;

        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("chat_llm: missing required field 'model'")));

        Ok(())
    }

    #[test]
    fn test_unknown_llm_type() -> Result<()> {
        let validator = ConfigValidator::new(false);
        let yaml = VALID.replace("type: maas", "type: bedrock");
        let result = validator.validate_str(&yaml, "inline")?;

        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("unknown LLM type 'bedrock'")));

        Ok(())
    }

    #[test]
    fn test_strict_flags_unknown_top_level_key() -> Result<()> {
        let yaml = format!("{VALID}\nmemory:\n  kind: vector\n");

        let lenient = ConfigValidator::new(false);
        let result = lenient.validate_str(&yaml, "inline")?;
        assert!(result.is_valid);

        let strict = ConfigValidator::new(true);
        let result = strict.validate_str(&yaml, "inline")?;
        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("Unknown top-level key 'memory'")));

        Ok(())
    }

    #[test]
    fn test_strict_flags_unknown_prompt_template() -> Result<()> {
        let yaml = VALID.replace(
            "type: default_iterative_planning",
            "type: my_custom_planning",
        );

        let lenient = ConfigValidator::new(false);
        assert!(lenient.validate_str(&yaml, "inline")?.is_valid);

        let strict = ConfigValidator::new(true);
        let result = strict.validate_str(&yaml, "inline")?;
        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("unknown template 'my_custom_planning'")
                && i.contains("default_static_planning")));

        Ok(())
    }

    #[test]
    fn test_root_must_be_mapping() -> Result<()> {
        let validator = ConfigValidator::new(false);
        let result = validator.validate_str("- a\n- b\n", "inline")?;

        assert!(!result.is_valid);
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("root must be a mapping")));

        Ok(())
    }
}
