//! Built-in prompt templates, selected by the `type` tags of the
//! `plan_prompt`, `rewrite_prompt`, and `generated_prompt` records.

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const ITERATIVE_PLANNING: &str = "default_iterative_planning";
pub const STATIC_PLANNING: &str = "default_static_planning";
pub const QUERY_REWRITE: &str = "default_query_rewrite";
pub const REFER_GENERATOR: &str = "default_refer_generator";
pub const MATH: &str = "default_math";
pub const DEDUCE: &str = "default_deduce";

const ITERATIVE_PLANNING_TEMPLATE: &str = r#"You are solving the question step by step.

Question: {question}

Steps answered so far:
{memory}

Available executors: {executors}

Decide the single next step. Respond with one JSON object and nothing else:
  {"action": "execute", "executor": "<tag>", "query": "<self-contained sub-question>"}
or, if the steps above already contain enough information to answer:
  {"action": "finish"}"#;

const STATIC_PLANNING_TEMPLATE: &str = r#"Decompose the question into the smallest set of sub-questions that
together determine the answer.

Question: {question}

Available executors: {executors}

Respond with a JSON array and nothing else. Each element is
  {"executor": "<tag>", "query": "<sub-question>", "deps": [<indexes of earlier elements it needs>]}
A query may embed {{i}} to splice in the answer of element i."#;

const QUERY_REWRITE_TEMPLATE: &str = r#"Rewrite the sub-question so it stands alone, substituting answers
already known.

Known answers:
{memory}

Sub-question: {query}

Respond with the rewritten sub-question only."#;

const REFER_GENERATOR_TEMPLATE: &str = r#"Answer the question using only the evidence below. Cite references
by id in square brackets where they support a claim. If the evidence is
insufficient, say so.

Question: {question}

Solved sub-questions:
{memory}

References:
{references}

Answer:"#;

const MATH_TEMPLATE: &str = r#"Solve the calculation. Show no working; respond with the final value
only.

Context:
{memory}

Problem: {query}"#;

const DEDUCE_TEMPLATE: &str = r#"Answer the question by reasoning over the context. Respond with the
conclusion only.

Context:
{memory}

Question: {query}"#;

static TEMPLATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (ITERATIVE_PLANNING, ITERATIVE_PLANNING_TEMPLATE),
        (STATIC_PLANNING, STATIC_PLANNING_TEMPLATE),
        (QUERY_REWRITE, QUERY_REWRITE_TEMPLATE),
        (REFER_GENERATOR, REFER_GENERATOR_TEMPLATE),
        (MATH, MATH_TEMPLATE),
        (DEDUCE, DEDUCE_TEMPLATE),
    ])
});

pub fn lookup(kind: &str) -> Option<&'static str> {
    TEMPLATES.get(kind).copied()
}

pub fn known_tags() -> Vec<&'static str> {
    let mut tags: Vec<_> = TEMPLATES.keys().copied().collect();
    tags.sort_unstable();
    tags
}

/// Substitute `{name}` placeholders. Unknown placeholders are left
/// untouched, so JSON braces in templates survive.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}
