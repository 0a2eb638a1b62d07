//! Language-model backends
//!
//! Currently a single backend: OpenAI chat completions. The backend
//! implements the core `LanguageModel` trait so the session driver never
//! sees vendor types.

mod openai;

pub use openai::{OpenAiConfig, OpenAiLlm};

use thiserror::Error;

/// LLM backend errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Network(e.to_string())
    }
}

impl From<LlmError> for cascade_core::Error {
    fn from(e: LlmError) -> Self {
        cascade_core::Error::Llm(e.to_string())
    }
}
