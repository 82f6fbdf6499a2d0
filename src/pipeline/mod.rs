//! Planner/executor/generator traits and the two solver pipelines.
//!
//! A pipeline answers a question by letting a planner decompose it into
//! tasks, routing each task to the executor whose tag it names, and
//! handing the accumulated evidence to a generator for the final answer.

pub mod executors;
pub mod generator;
pub mod iterative;
pub mod planner;
pub mod prompts;
pub mod registry;
pub mod static_plan;

pub use iterative::IterativeSolverPipeline;
pub use registry::{BuildContext, ExecutorRegistry};
pub use static_plan::StaticSolverPipeline;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work the planner hands to an executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// Tag of the executor that should handle this task.
    pub executor: String,
    pub query: String,
    /// Tasks whose results this one depends on (static planning).
    #[serde(default)]
    pub deps: Vec<Uuid>,
}

impl Task {
    pub fn new(executor: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            executor: executor.into(),
            query: query.into(),
            deps: Vec::new(),
        }
    }
}

/// Evidence retrieved for a task, kept for citation by the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub content: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: Uuid,
    pub executor: String,
    pub query: String,
    pub output: String,
    #[serde(default)]
    pub references: Vec<Reference>,
    pub finished_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn new(task: &Task, output: impl Into<String>) -> Self {
        Self {
            task_id: task.id,
            executor: task.executor.clone(),
            query: task.query.clone(),
            output: output.into(),
            references: Vec::new(),
            finished_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_references(mut self, references: Vec<Reference>) -> Self {
        self.references = references;
        self
    }
}

/// Results of completed tasks, shared between planner rounds and read by
/// executors and the generator.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    results: Vec<TaskResult>,
}

impl Memory {
    pub fn record(&mut self, result: TaskResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn output_of(&self, task_id: Uuid) -> Option<&str> {
        self.results
            .iter()
            .find(|r| r.task_id == task_id)
            .map(|r| r.output.as_str())
    }

    /// Numbered sub-question/answer lines, for planner and generator
    /// prompts.
    pub fn transcript(&self) -> String {
        self.results
            .iter()
            .enumerate()
            .map(|(idx, r)| format!("{}. Q: {}\n   A: {}", idx + 1, r.query, r.output))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.results.iter().flat_map(|r| r.references.iter())
    }
}

/// Outcome of one planning round.
#[derive(Debug, Clone)]
pub enum Plan {
    /// Execute these tasks, then (for iterative pipelines) plan again.
    Continue(Vec<Task>),
    /// Enough evidence has been gathered; hand over to the generator.
    Finish,
}

#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, question: &str, memory: &Memory) -> Result<Plan>;
}

#[async_trait]
pub trait Executor: Send + Sync {
    fn tag(&self) -> &'static str;

    async fn execute(&self, task: &Task, memory: &Memory) -> Result<TaskResult>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, question: &str, memory: &Memory) -> Result<String>;
}

impl std::fmt::Debug for dyn Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Planner")
    }
}

impl std::fmt::Debug for dyn Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Executor")
    }
}

impl std::fmt::Debug for dyn Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Generator")
    }
}

/// In-memory trait implementations for exercising the pipeline loops
/// without an LLM backend.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Replays a fixed sequence of plans, then finishes.
    pub struct ScriptedPlanner {
        plans: Mutex<Vec<Plan>>,
    }

    impl ScriptedPlanner {
        pub fn new(mut plans: Vec<Plan>) -> Self {
            plans.reverse();
            Self {
                plans: Mutex::new(plans),
            }
        }
    }

    #[async_trait]
    impl Planner for ScriptedPlanner {
        async fn plan(&self, _question: &str, _memory: &Memory) -> Result<Plan> {
            Ok(self.plans.lock().unwrap().pop().unwrap_or(Plan::Finish))
        }
    }

    /// Plans one more task every round and never finishes.
    pub struct RepeatPlanner {
        pub executor: String,
    }

    #[async_trait]
    impl Planner for RepeatPlanner {
        async fn plan(&self, _question: &str, memory: &Memory) -> Result<Plan> {
            Ok(Plan::Continue(vec![Task::new(
                self.executor.clone(),
                format!("step {}", memory.results().len() + 1),
            )]))
        }
    }

    /// Records every query it handles and answers with `ans:<query>`.
    pub struct RecordingExecutor {
        pub handled: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Executor for RecordingExecutor {
        fn tag(&self) -> &'static str {
            "recording_executor"
        }

        async fn execute(&self, task: &Task, _memory: &Memory) -> Result<TaskResult> {
            self.handled.lock().unwrap().push(task.query.clone());
            Ok(TaskResult::new(task, format!("ans:{}", task.query)))
        }
    }

    /// Answers with the number of recorded results.
    pub struct CountingGenerator;

    #[async_trait]
    impl Generator for CountingGenerator {
        async fn generate(&self, _question: &str, memory: &Memory) -> Result<String> {
            Ok(memory.results().len().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_transcript_numbers_entries() {
        let mut memory = Memory::default();
        let first = Task::new("retrieval_executor", "who wrote it?");
        let second = Task::new("deduce_executor", "was it before 1990?");
        memory.record(TaskResult::new(&first, "Ursula K. Le Guin"));
        memory.record(TaskResult::new(&second, "yes"));

        let transcript = memory.transcript();
        assert!(transcript.starts_with("1. Q: who wrote it?"));
        assert!(transcript.contains("2. Q: was it before 1990?"));
        assert_eq!(memory.output_of(first.id), Some("Ursula K. Le Guin"));
    }

    #[test]
    fn test_memory_collects_references() {
        let mut memory = Memory::default();
        let task = Task::new("retrieval_executor", "q");
        memory.record(TaskResult::new(&task, "out").with_references(vec![Reference {
            id: "chunk-1".to_string(),
            content: "text".to_string(),
            score: 0.9,
        }]));

        assert_eq!(memory.references().count(), 1);
    }
}
