//! Configuration management for the lead qualification engine
//!
//! Supports loading configuration from:
//! - TOML files (`config/default.toml`, `config/{env}.toml`)
//! - Environment variables (`LEAD_QUALIFIER__` prefix, `__` separator)
//!
//! Besides process settings this crate owns the engine's injected artifacts:
//! - `ScoringTable` - points per canonical answer and the qualification threshold
//! - `QuestionCatalog` - questions, option labels and closing copy
//! - `PromptTemplates` / `PersonaConfig` - natural-language prompts

pub mod constants;
pub mod prompts;
pub mod questions;
pub mod scoring;
pub mod settings;

pub use prompts::{render, PersonaConfig, PromptTemplates};
pub use questions::{Question, QuestionCatalog};
pub use scoring::{OptionPoints, ScoringTable};
pub use settings::{
    load_settings, CrmConfig, EmailConfig, LlmConfig, NotificationsConfig, ObservabilityConfig,
    PersistenceConfig, QualificationConfig, RuntimeEnvironment, ServerConfig, Settings,
    StrategyKind, TransportConfig, TransportProvider, TwilioConfig, ENV_PREFIX,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
