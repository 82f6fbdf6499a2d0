use super::planner::LlmStaticPlanner;
use super::registry::{BuildContext, ExecutorRegistry};
use super::{Executor, Generator, Memory, Plan, Planner, Task};
use crate::config::{PipelineConfig, SolveConfig};
use crate::error::{Error, Result};
use crate::llm::build_client;
use crate::pipeline::generator::LlmGenerator;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub const STATIC_PIPELINE_TAG: &str = "static_pipeline";

/// Plan the whole task list once, then execute it in dependency order,
/// running independent tasks of each wave concurrently.
#[derive(Debug)]
pub struct StaticSolverPipeline {
    planner: Arc<dyn Planner>,
    executors: HashMap<String, Arc<dyn Executor>>,
    generator: Arc<dyn Generator>,
}

impl StaticSolverPipeline {
    pub fn from_config(config: &SolveConfig, pipeline: &PipelineConfig) -> Result<Self> {
        if pipeline.kind != STATIC_PIPELINE_TAG {
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
        let planner = LlmStaticPlanner::from_config(&pipeline.planner, planner_llm, tags)?;

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
        })
    }

    pub async fn solve(&self, question: &str) -> Result<String> {
        let mut memory = Memory::default();

        let tasks = match self.planner.plan(question, &memory).await? {
            Plan::Continue(tasks) => tasks,
            Plan::Finish => Vec::new(),
        };
        info!("static plan has {} task(s)", tasks.len());

        // Index positions by id so {{i}} placeholders can be spliced.
        let index_of: HashMap<Uuid, usize> =
            tasks.iter().enumerate().map(|(i, t)| (t.id, i)).collect();

        let mut done = vec![false; tasks.len()];
        while done.iter().any(|d| !d) {
            let ready: Vec<usize> = (0..tasks.len())
                .filter(|&i| !done[i])
                .filter(|&i| {
                    tasks[i]
                        .deps
                        .iter()
                        .all(|dep| index_of.get(dep).is_some_and(|&j| done[j]))
                })
                .collect();

            if ready.is_empty() {
                return Err(Error::Planner(
                    "static plan contains an unsatisfiable dependency".to_string(),
                ));
            }

            let wave = ready.iter().map(|&i| {
                let task = rewrite_task(&tasks[i], &tasks, &memory);
                let executor = self.executors.get(&task.executor).cloned();
                let snapshot = memory.clone();
                async move {
                    let executor = executor.ok_or_else(|| {
                        Error::UnknownTag(format!("executor '{}'", task.executor))
                    })?;
                    debug!("{} handling '{}'", task.executor, task.query);
                    executor.execute(&task, &snapshot).await
                }
            });

            let results = futures::future::try_join_all(wave).await?;
            for (i, result) in ready.into_iter().zip(results) {
                memory.record(result);
                done[i] = true;
            }
        }

        self.generator.generate(question, &memory).await
    }
}

/// Splice `{{i}}` placeholders with the recorded output of task `i`.
fn rewrite_task(task: &Task, tasks: &[Task], memory: &Memory) -> Task {
    let mut rewritten = task.clone();
    for dep in &task.deps {
        if let Some(output) = memory.output_of(*dep) {
            if let Some(index) = tasks.iter().position(|t| t.id == *dep) {
                rewritten.query = rewritten
                    .query
                    .replace(&format!("{{{{{index}}}}}"), output);
            }
        }
    }
    rewritten
}
