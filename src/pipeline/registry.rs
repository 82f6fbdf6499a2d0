use super::executors::{
    DeduceExecutor, MathExecutor, RetrievalExecutor, DEDUCE_TAG, MATH_TAG, RETRIEVAL_TAG,
};
use super::Executor;
use crate::config::pipeline::ExecutorConfig;
use crate::config::{LlmConfig, ProjectConfig};
use crate::error::{Error, Result};
use crate::llm::build_client;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything an executor builder may need beyond its own record.
pub struct BuildContext {
    pub default_llm: LlmConfig,
    pub project: ProjectConfig,
}

type ExecutorBuilder = fn(&ExecutorConfig, &BuildContext) -> Result<Arc<dyn Executor>>;

/// Maps executor `type` tags to constructors. The validator asks it
/// which tags exist; the pipelines ask it to build them.
pub struct ExecutorRegistry {
    builders: HashMap<&'static str, ExecutorBuilder>,
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            builders: HashMap::new(),
        };
        registry.register(RETRIEVAL_TAG, build_retrieval);
        registry.register(MATH_TAG, build_math);
        registry.register(DEDUCE_TAG, build_deduce);
        registry
    }

    fn register(&mut self, tag: &'static str, builder: ExecutorBuilder) {
        self.builders.insert(tag, builder);
    }

    pub fn known_tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.builders.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    pub fn build(
        &self,
        config: &ExecutorConfig,
        context: &BuildContext,
    ) -> Result<Arc<dyn Executor>> {
        let builder = self
            .builders
            .get(config.kind.as_str())
            .ok_or_else(|| Error::UnknownTag(format!("executor '{}'", config.kind)))?;
        builder(config, context)
    }
}

fn executor_llm(config: &ExecutorConfig, context: &BuildContext) -> LlmConfig {
    config
        .llm
        .clone()
        .unwrap_or_else(|| context.default_llm.clone())
}

fn build_retrieval(config: &ExecutorConfig, context: &BuildContext) -> Result<Arc<dyn Executor>> {
    let top_k = config.param_u64("top_k");
    Ok(Arc::new(RetrievalExecutor::new(&context.project, top_k)))
}

fn build_math(config: &ExecutorConfig, context: &BuildContext) -> Result<Arc<dyn Executor>> {
    let llm = build_client(&executor_llm(config, context))?;
    Ok(Arc::new(MathExecutor::new(llm)))
}

fn build_deduce(config: &ExecutorConfig, context: &BuildContext) -> Result<Arc<dyn Executor>> {
    let llm = build_client(&executor_llm(config, context))?;
    Ok(Arc::new(DeduceExecutor::new(llm)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> BuildContext {
        BuildContext {
            default_llm: serde_yaml::from_str("type: openai\nbase_url: u\nmodel: m\n").unwrap(),
            project: serde_yaml::from_str(
                "host_addr: http://127.0.0.1:8887\nid: \"1\"\nnamespace: Test\n",
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_known_tags_sorted() {
        let registry = ExecutorRegistry::new();
        assert_eq!(
            registry.known_tags(),
            vec![DEDUCE_TAG, MATH_TAG, RETRIEVAL_TAG]
        );
    }

    #[test]
    fn test_build_each_known_tag() {
        let registry = ExecutorRegistry::new();
        let ctx = context();
        for tag in registry.known_tags() {
            let config: ExecutorConfig =
                serde_yaml::from_str(&format!("type: {tag}\n")).unwrap();
            let executor = registry.build(&config, &ctx).unwrap();
            assert_eq!(executor.tag(), tag);
        }
    }

    #[test]
    fn test_build_unknown_tag_errors() {
        let registry = ExecutorRegistry::new();
        let config: ExecutorConfig = serde_yaml::from_str("type: quantum_executor\n").unwrap();
        let err = registry.build(&config, &context()).unwrap_err();
        assert!(matches!(err, Error::UnknownTag(_)));
    }
}
