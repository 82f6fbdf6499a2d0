//! End-to-end checks of the shipped example configuration: it must
//! parse into the typed model, pass strict validation, resolve its LLM
//! fallbacks, and build both pipelines.

use solvekit::config::{ConfigLoader, ConfigValidator, SolveConfig};
use solvekit::pipeline::{IterativeSolverPipeline, StaticSolverPipeline};
use std::io::Write;

const EXAMPLE: &str = include_str!("../solvekit.example.yaml");

#[test]
fn example_config_parses() {
    let config = SolveConfig::from_yaml_str(EXAMPLE).unwrap();
    assert_eq!(config.chat_llm.model, "deepseek-chat");
    assert_eq!(config.project.namespace, "TwoWiki");

    let iterative = config.iterative_solver_pipeline.as_ref().unwrap();
    assert_eq!(iterative.max_iterations, 10);
    assert_eq!(iterative.executors.len(), 3);
    assert_eq!(iterative.executors[0].param_u64("top_k"), Some(5));

    let stat = config.static_solver_pipeline.as_ref().unwrap();
    assert_eq!(stat.executors.len(), 2);
}

#[test]
fn example_config_passes_strict_validation() {
    let validator = ConfigValidator::new(true);
    let result = validator.validate_str(EXAMPLE, "solvekit.example.yaml").unwrap();
    assert!(result.is_valid, "issues: {:?}", result.issues);
    assert!(result.suggestions.is_empty());
}

#[test]
fn example_config_builds_both_pipelines() {
    let mut config = SolveConfig::from_yaml_str(EXAMPLE).unwrap();
    config.resolve();

    let iterative = config.iterative_solver_pipeline.clone().unwrap();
    IterativeSolverPipeline::from_config(&config, &iterative).unwrap();

    let stat = config.static_solver_pipeline.clone().unwrap();
    StaticSolverPipeline::from_config(&config, &stat).unwrap();
}

#[tokio::test]
async fn loader_round_trip_through_disk() {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(EXAMPLE.as_bytes()).unwrap();

    let loader = ConfigLoader::load(file.path()).await.unwrap();
    let config = loader.get_config();

    // resolve() ran inside the loader: the math executor of the static
    // pipeline declared no llm and must have inherited chat_llm.
    let stat = config.static_solver_pipeline.as_ref().unwrap();
    assert_eq!(
        stat.executors[1].llm.as_ref().unwrap().model,
        "deepseek-chat"
    );

    // Redacted view leaks no key material.
    let shown = serde_yaml::to_string(&config.redacted()).unwrap();
    assert!(!shown.contains("api_key: key"));
}

#[test]
fn validator_reports_multiple_issues_at_once() {
    let broken = EXAMPLE
        .replace("type: retrieval_executor", "type: unknown_executor")
        .replace("  model: deepseek-chat\n", "");

    let validator = ConfigValidator::new(false);
    let result = validator.validate_str(&broken, "inline").unwrap();

    assert!(!result.is_valid);
    // Both pipelines use the executor, and the anchor-shared llm record
    // lost its model, so at least three findings surface together.
    assert!(result.issues.len() >= 3, "issues: {:?}", result.issues);
}
