use super::planner::LlmIterativePlanner;
use super::registry::{BuildContext, ExecutorRegistry};
use super::{Executor, Generator, Memory, Plan, Planner};
use crate::config::{PipelineConfig, SolveConfig};
use crate::error::{Error, Result};
use crate::llm::build_client;
use crate::pipeline::generator::LlmGenerator;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub const ITERATIVE_PIPELINE_TAG: &str = "iterative_pipeline";

/// Plan one step, execute it, plan again with the new evidence; stop
/// when the planner finishes or `max_iterations` rounds have run.
#[derive(Debug)]
pub struct IterativeSolverPipeline {
    planner: Arc<dyn Planner>,
    executors: HashMap<String, Arc<dyn Executor>>,
    generator: Arc<dyn Generator>,
    max_iterations: u32,
}

impl IterativeSolverPipeline {
    pub fn from_config(config: &SolveConfig, pipeline: &PipelineConfig) -> Result<Self> {
        if pipeline.kind != ITERATIVE_PIPELINE_TAG {
            return Err(Error::UnknownTag(format!("pipeline '{}'", pipeline.kind)));
        }

        let context = BuildContext {
            default_llm: config.chat_llm.clone(),
            project: config.project.clone(),
        };
        let registry = ExecutorRegistry::new();

        let mut executors = HashMap::new();
        for executor_config in &pipeline.executors {
            let executor = registry.build(executor_config, &context)?;
            executors.insert(executor_config.kind.clone(), executor);
        }
        let tags: Vec<String> = pipeline
            .executors
            .iter()
            .map(|e| e.kind.clone())
            .collect();

        let planner_llm = build_client(
            pipeline
                .planner
                .llm
                .as_ref()
                .unwrap_or(&config.chat_llm),
        )?;
        let planner = LlmIterativePlanner::from_config(&pipeline.planner, planner_llm, tags)?;

        let generator_llm = build_client(
            pipeline
                .generator
                .llm
                .as_ref()
                .unwrap_or(&config.chat_llm),
        )?;
        let generator = LlmGenerator::from_config(&pipeline.generator, generator_llm)?;

        Ok(Self {
            planner: Arc::new(planner),
            executors,
            generator: Arc::new(generator),
            max_iterations: pipeline.max_iterations,
        })
    }

    pub async fn solve(&self, question: &str) -> Result<String> {
        let mut memory = Memory::default();

        for round in 1..=self.max_iterations {
            match self.planner.plan(question, &memory).await? {
                Plan::Finish => {
                    info!("planner finished after {} round(s)", round - 1);
                    break;
                }
                Plan::Continue(tasks) => {
                    for task in tasks {
                        let executor = self.executors.get(&task.executor).ok_or_else(|| {
                            Error::UnknownTag(format!("executor '{}'", task.executor))
                        })?;
                        debug!(
                            "round {round}: {} handling '{}'",
                            task.executor, task.query
                        );
                        let result = executor.execute(&task, &memory).await?;
                        memory.record(result);
                    }
                }
            }
        }

        self.generator.generate(question, &memory).await
    }
}
