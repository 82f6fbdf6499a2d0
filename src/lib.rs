//! # Solvekit
//!
//! Typed configuration and a runtime for retrieval/planning solver
//! pipelines: an LLM planner decomposes a question into tasks, tagged
//! executors resolve them (retrieval, math, deduction), and a generator
//! writes the final answer from the collected evidence.
//!
//! ## Usage
//!
//! ```bash
//! solvekit validate solvekit.yaml
//! solvekit ask "who directed the film?" --config solvekit.yaml
//! ```
//!
//! ## Modules
//!
//! - `config` - YAML configuration model, loader, and structural validator
//! - `llm` - OpenAI-compatible chat client with request rate limiting
//! - `pipeline` - Planner/executor/generator traits and the two solver pipelines
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;

pub use error::{Error, Result};
