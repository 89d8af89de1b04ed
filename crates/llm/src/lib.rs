//! LLM integration
//!
//! Features:
//! - OpenAI-compatible chat completions (OpenAI, Azure, vLLM, local servers)
//! - Adapter exposing any backend as the core `CompletionModel`
//! - Prompt helpers: transcript windowing and JSON extraction from replies

pub mod adapter;
pub mod backend;
pub mod prompt;

pub use adapter::CompletionAdapter;
pub use backend::{FinishReason, GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig};
pub use prompt::{extract_json_object, format_history, Message, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for lead_qualifier_core::Error {
    fn from(err: LlmError) -> Self {
        lead_qualifier_core::Error::Llm(err.to_string())
    }
}
