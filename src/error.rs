use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Planner error: {0}")]
    Planner(String),

    #[error("Executor error: {0}")]
    Executor(String),

    #[error("Unknown type tag: {0}")]
    UnknownTag(String),
}

pub type Result<T> = std::result::Result<T, Error>;
