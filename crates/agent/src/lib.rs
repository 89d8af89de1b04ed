//! Lead qualification engine
//!
//! Features:
//! - Answer extraction from free-text replies (letters, amounts, keywords)
//! - Table-driven lead scoring
//! - Deterministic question state machine
//! - Natural-language strategy driven by a completion model
//! - Orchestration with per-lead locking, CAS persistence and delivery rollback
//! - Completion fan-out to notification channels

pub mod extractor;
pub mod fanout;
pub mod locks;
pub mod metrics;
pub mod orchestrator;
pub mod scoring;
pub mod stage;
pub mod strategy;

pub use extractor::AnswerExtractor;
pub use fanout::{CompletionFanout, FanoutReport};
pub use locks::{LeadGuard, SessionLocks};
pub use metrics::register_metrics;
pub use orchestrator::{EngineBuilder, InboundOutcome, QualificationEngine, SessionView, StartOutcome};
pub use scoring::{ScoreCard, ScoringModel};
pub use stage::{StageMachine, StageTransition, TransitionReason};
pub use strategy::{
    pin_strategy, pinned_strategy, ConversationalStrategy, DeterministicStrategy,
    QualificationStrategy, StrategySet, Turn,
};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Lead already has an active session: {0}")]
    SessionAlreadyActive(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<lead_qualifier_core::Error> for AgentError {
    fn from(err: lead_qualifier_core::Error) -> Self {
        use lead_qualifier_core::Error;
        match err {
            Error::Storage(msg) => AgentError::Storage(msg),
            Error::NotFound(msg) => AgentError::NotFound(msg),
            Error::Conflict(msg) => AgentError::Conflict(msg),
            Error::Transport(msg) => AgentError::Delivery(msg),
            Error::Llm(msg) => AgentError::Llm(msg),
            Error::Notification(msg) => AgentError::Notification(msg),
            Error::InvalidInput(msg) => AgentError::InvalidInput(msg),
            Error::Serialization(e) => AgentError::Storage(e.to_string()),
        }
    }
}

impl From<lead_qualifier_config::ConfigError> for AgentError {
    fn from(err: lead_qualifier_config::ConfigError) -> Self {
        AgentError::Configuration(err.to_string())
    }
}

impl From<lead_qualifier_llm::LlmError> for AgentError {
    fn from(err: lead_qualifier_llm::LlmError) -> Self {
        AgentError::Llm(err.to_string())
    }
}
