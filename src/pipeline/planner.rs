use super::{prompts, Memory, Plan, Planner, Task};
use crate::config::pipeline::PlannerConfig;
use crate::error::{Error, Result};
use crate::llm::LlmClient;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub const ITERATIVE_PLANNER_TAG: &str = "iterative_planner";
pub const STATIC_PLANNER_TAG: &str = "static_planner";

/// Slice the first JSON value of the expected shape out of a model
/// response, tolerating code fences and surrounding prose.
fn extract_json(raw: &str, open: char, close: char) -> Option<&str> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    (end > start).then(|| &raw[start..=end])
}

fn resolve_template(
    selector: Option<&crate::config::pipeline::PromptSelector>,
    default: &str,
) -> Result<&'static str> {
    let kind = selector.map_or(default, |s| s.kind.as_str());
    prompts::lookup(kind).ok_or_else(|| Error::UnknownTag(format!("prompt template '{kind}'")))
}

/// Plans one step at a time, deciding after each round whether the
/// collected answers suffice.
pub struct LlmIterativePlanner {
    llm: Arc<dyn LlmClient>,
    plan_template: &'static str,
    executor_tags: Vec<String>,
}

impl LlmIterativePlanner {
    pub fn from_config(
        config: &PlannerConfig,
        llm: Arc<dyn LlmClient>,
        executor_tags: Vec<String>,
    ) -> Result<Self> {
        if config.kind != ITERATIVE_PLANNER_TAG {
            return Err(Error::UnknownTag(format!("planner '{}'", config.kind)));
        }
        let plan_template =
            resolve_template(config.plan_prompt.as_ref(), prompts::ITERATIVE_PLANNING)?;
        // The rewrite selector must at least name a real template even
        // though iterative planning folds rewriting into the plan prompt.
        resolve_template(config.rewrite_prompt.as_ref(), prompts::QUERY_REWRITE)?;
        Ok(Self {
            llm,
            plan_template,
            executor_tags,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawStep {
    action: String,
    #[serde(default)]
    executor: Option<String>,
    #[serde(default)]
    query: Option<String>,
}

fn parse_step(raw: &str) -> Result<Plan> {
    let json = extract_json(raw, '{', '}')
        .ok_or_else(|| Error::Planner(format!("no JSON object in planner response: {raw}")))?;
    let step: RawStep = serde_json::from_str(json)
        .map_err(|e| Error::Planner(format!("malformed planner step: {e}")))?;

    match step.action.as_str() {
        "finish" => Ok(Plan::Finish),
        "execute" => {
            let executor = step
                .executor
                .ok_or_else(|| Error::Planner("execute step missing 'executor'".to_string()))?;
            let query = step
                .query
                .ok_or_else(|| Error::Planner("execute step missing 'query'".to_string()))?;
            Ok(Plan::Continue(vec![Task::new(executor, query)]))
        }
        other => Err(Error::Planner(format!("unknown plan action '{other}'"))),
    }
}

#[async_trait]
impl Planner for LlmIterativePlanner {
    async fn plan(&self, question: &str, memory: &Memory) -> Result<Plan> {
        let transcript = if memory.is_empty() {
            "(none yet)".to_string()
        } else {
            memory.transcript()
        };
        let prompt = prompts::render(
            self.plan_template,
            &[
                ("question", question),
                ("memory", &transcript),
                ("executors", &self.executor_tags.join(", ")),
            ],
        );
        let raw = self.llm.complete(&prompt).await?;
        debug!("planner response: {raw}");
        parse_step(&raw)
    }
}

/// Plans the whole task list up front; dependencies between sub-questions
/// are expressed as indexes into the list.
pub struct LlmStaticPlanner {
    llm: Arc<dyn LlmClient>,
    plan_template: &'static str,
    executor_tags: Vec<String>,
}

impl LlmStaticPlanner {
    pub fn from_config(
        config: &PlannerConfig,
        llm: Arc<dyn LlmClient>,
        executor_tags: Vec<String>,
    ) -> Result<Self> {
        if config.kind != STATIC_PLANNER_TAG {
            return Err(Error::UnknownTag(format!("planner '{}'", config.kind)));
        }
        let plan_template =
            resolve_template(config.plan_prompt.as_ref(), prompts::STATIC_PLANNING)?;
        resolve_template(config.rewrite_prompt.as_ref(), prompts::QUERY_REWRITE)?;
        Ok(Self {
            llm,
            plan_template,
            executor_tags,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawPlanEntry {
    executor: String,
    query: String,
    #[serde(default)]
    deps: Vec<usize>,
}

fn parse_plan(raw: &str) -> Result<Vec<Task>> {
    let json = extract_json(raw, '[', ']')
        .ok_or_else(|| Error::Planner(format!("no JSON array in planner response: {raw}")))?;
    let entries: Vec<RawPlanEntry> = serde_json::from_str(json)
        .map_err(|e| Error::Planner(format!("malformed static plan: {e}")))?;
    if entries.is_empty() {
        return Err(Error::Planner("static plan has no tasks".to_string()));
    }

    let tasks: Vec<Task> = entries
        .iter()
        .map(|e| Task::new(e.executor.clone(), e.query.clone()))
        .collect();

    let mut linked = Vec::with_capacity(tasks.len());
    for (idx, (mut task, entry)) in tasks.clone().into_iter().zip(&entries).enumerate() {
        for &dep in &entry.deps {
            if dep >= idx {
                return Err(Error::Planner(format!(
                    "task {idx} depends on task {dep}, which does not precede it"
                )));
            }
            task.deps.push(tasks[dep].id);
        }
        linked.push(task);
    }
    Ok(linked)
}

#[async_trait]
impl Planner for LlmStaticPlanner {
    async fn plan(&self, question: &str, _memory: &Memory) -> Result<Plan> {
        let prompt = prompts::render(
            self.plan_template,
            &[
                ("question", question),
                ("executors", &self.executor_tags.join(", ")),
            ],
        );
        let raw = self.llm.complete(&prompt).await?;
        debug!("planner response: {raw}");
        Ok(Plan::Continue(parse_plan(&raw)?))
    }
}
