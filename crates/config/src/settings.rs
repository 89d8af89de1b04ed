//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{endpoints, notifications, qualification, timeouts};
use crate::prompts::{PersonaConfig, PromptTemplates};
use crate::{ConfigError, QuestionCatalog, ScoringTable};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "LEAD_QUALIFIER";

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Relaxed validation, warnings only
    #[default]
    Development,
    Staging,
    /// All validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// ScyllaDB persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub qualification: QualificationConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    /// Messaging provider
    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_qualification()?;
        self.validate_llm()?;
        self.validate_transport()?;
        self.validate_notifications()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 This may block legitimate requests."
            );
        }

        Ok(())
    }

    fn validate_qualification(&self) -> Result<(), ConfigError> {
        let q = &self.qualification;

        if q.default_tenant_id.trim().is_empty() {
            return Err(ConfigError::MissingField(
                "qualification.default_tenant_id".to_string(),
            ));
        }

        if let Some(table) = &q.scoring {
            table.validate()?;
        }

        if q.history_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "qualification.history_window".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if q.readiness_fallback_entries < 2 {
            return Err(ConfigError::InvalidValue {
                field: "qualification.readiness_fallback_entries".to_string(),
                message: "Must cover at least one exchange (2 entries)".to_string(),
            });
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            });
        }

        if llm.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_tokens".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.qualification.uses_natural_language() {
            if llm.endpoint.trim().is_empty() {
                return Err(ConfigError::MissingField("llm.endpoint".to_string()));
            }
            if llm.api_key.is_none() {
                if self.environment.is_strict() {
                    return Err(ConfigError::MissingField("llm.api_key".to_string()));
                }
                tracing::warn!("llm.api_key not configured; natural-language strategy will fail");
            }
        }

        Ok(())
    }

    fn validate_transport(&self) -> Result<(), ConfigError> {
        if self.transport.provider != TransportProvider::Twilio {
            if self.environment.is_production() {
                tracing::warn!("Simulated transport selected in production; messages are only logged");
            }
            return Ok(());
        }

        let twilio = &self.transport.twilio;
        for (field, value) in [
            ("transport.twilio.account_sid", &twilio.account_sid),
            ("transport.twilio.auth_token", &twilio.auth_token),
            ("transport.twilio.from_number", &twilio.from_number),
        ] {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(ConfigError::MissingField(field.to_string()));
            }
        }

        Ok(())
    }

    fn validate_notifications(&self) -> Result<(), ConfigError> {
        let email = &self.notifications.email;
        if email.smtp_host.is_some() && email.smtp_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "notifications.email.smtp_port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if email.smtp_host.is_some() && email.from_address.is_none() && email.smtp_user.is_none() {
            return Err(ConfigError::MissingField(
                "notifications.email.from_address".to_string(),
            ));
        }

        if let Some(url) = &self.notifications.crm.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "notifications.crm.webhook_url".to_string(),
                    message: format!("Must be an http(s) URL, got '{}'", url),
                });
            }
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_server_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_server_timeout() -> u64 {
    timeouts::SERVER_REQUEST_SECS
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_server_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Serve Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Persistence configuration for ScyllaDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable ScyllaDB persistence (false = in-memory only)
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec![endpoints::SCYLLA_DEFAULT.to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "lead_qualifier".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

/// Extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Fixed multiple-choice questions interpreted by the answer extractor
    #[default]
    Deterministic,
    /// Open-ended dialogue driven by the completion model
    NaturalLanguage,
}

/// Qualification engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualificationConfig {
    /// Strategy for tenants without an explicit entry in `tenant_strategies`
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Per-tenant strategy overrides
    #[serde(default)]
    pub tenant_strategies: HashMap<String, StrategyKind>,

    /// Tenant for leads created from inbound messages
    #[serde(default = "default_tenant_id")]
    pub default_tenant_id: String,

    /// Source recorded on leads created from inbound messages
    #[serde(default = "default_lead_source")]
    pub lead_source: String,

    /// Replaces the built-in scoring table
    #[serde(default)]
    pub scoring: Option<ScoringTable>,

    /// TOML file replacing the built-in question catalog
    #[serde(default)]
    pub catalog_path: Option<String>,

    /// Company description injected into natural-language prompts
    #[serde(default)]
    pub company_context: Option<String>,

    /// Per-tenant company descriptions
    #[serde(default)]
    pub tenant_company_context: HashMap<String, String>,

    #[serde(default)]
    pub persona: PersonaConfig,

    #[serde(default)]
    pub prompts: PromptTemplates,

    /// Transcript entries shown to the model per prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Transcript length at which an unparseable readiness reply counts as ready
    #[serde(default = "default_readiness_fallback_entries")]
    pub readiness_fallback_entries: usize,
}

fn default_tenant_id() -> String {
    qualification::DEFAULT_TENANT_ID.to_string()
}
fn default_lead_source() -> String {
    qualification::DEFAULT_LEAD_SOURCE.to_string()
}
fn default_history_window() -> usize {
    qualification::HISTORY_WINDOW
}
fn default_readiness_fallback_entries() -> usize {
    qualification::READINESS_FALLBACK_ENTRIES
}

impl Default for QualificationConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            tenant_strategies: HashMap::new(),
            default_tenant_id: default_tenant_id(),
            lead_source: default_lead_source(),
            scoring: None,
            catalog_path: None,
            company_context: None,
            tenant_company_context: HashMap::new(),
            persona: PersonaConfig::default(),
            prompts: PromptTemplates::default(),
            history_window: default_history_window(),
            readiness_fallback_entries: default_readiness_fallback_entries(),
        }
    }
}

impl QualificationConfig {
    pub fn strategy_for(&self, tenant_id: &str) -> StrategyKind {
        self.tenant_strategies
            .get(tenant_id)
            .copied()
            .unwrap_or(self.strategy)
    }

    /// True if any tenant can end up on the natural-language strategy
    pub fn uses_natural_language(&self) -> bool {
        self.strategy == StrategyKind::NaturalLanguage
            || self
                .tenant_strategies
                .values()
                .any(|s| *s == StrategyKind::NaturalLanguage)
    }

    /// Configured override or the built-in table
    pub fn scoring_table(&self) -> ScoringTable {
        self.scoring.clone().unwrap_or_default()
    }

    /// Configured catalog file or the built-in copy
    pub fn question_catalog(&self) -> Result<QuestionCatalog, ConfigError> {
        match &self.catalog_path {
            Some(path) => QuestionCatalog::load(path),
            None => Ok(QuestionCatalog::default()),
        }
    }

    pub fn company_context_for(&self, tenant_id: &str) -> &str {
        self.tenant_company_context
            .get(tenant_id)
            .or(self.company_context.as_ref())
            .map(|s| s.as_str())
            .unwrap_or(&self.prompts.default_company_context)
    }
}

/// LLM backend configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,

    /// Azure OpenAI API version; when set, `model` is the deployment name
    #[serde(default)]
    pub api_version: Option<String>,
}

fn default_llm_endpoint() -> String {
    endpoints::OPENAI_DEFAULT.to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    500
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout() -> u64 {
    timeouts::LLM_REQUEST_SECS
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_seconds: default_llm_timeout(),
            api_version: None,
        }
    }
}

/// Messaging provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportProvider {
    /// Log outbound messages, never contact a provider
    #[default]
    Simulated,
    Twilio,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransportConfig {
    #[serde(default)]
    pub provider: TransportProvider,

    #[serde(default)]
    pub twilio: TwilioConfig,
}

/// Twilio WhatsApp credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sender number, e.g. `+14155238886`
    #[serde(default)]
    pub from_number: Option<String>,

    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,

    #[serde(default = "default_transport_timeout")]
    pub timeout_seconds: u64,
}

fn default_twilio_api_base() -> String {
    endpoints::TWILIO_API_BASE.to_string()
}
fn default_transport_timeout() -> u64 {
    timeouts::TRANSPORT_SECS
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base: default_twilio_api_base(),
            timeout_seconds: default_transport_timeout(),
        }
    }
}

/// Completion notification channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub crm: CrmConfig,

    /// Write a `lead_qualified` audit event on qualification
    #[serde(default = "default_true")]
    pub audit_enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            email: EmailConfig::default(),
            crm: CrmConfig::default(),
            audit_enabled: true,
        }
    }
}

/// SMTP email channel. Without `smtp_host` the channel only logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_user: Option<String>,

    #[serde(default)]
    pub smtp_password: Option<String>,

    /// Sender address; falls back to `smtp_user`
    #[serde(default)]
    pub from_address: Option<String>,

    #[serde(default = "default_consultant_email")]
    pub consultant_email: String,
}

fn default_smtp_port() -> u16 {
    587
}
fn default_consultant_email() -> String {
    notifications::DEFAULT_CONSULTANT_EMAIL.to_string()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_user: None,
            smtp_password: None,
            from_address: None,
            consultant_email: default_consultant_email(),
        }
    }
}

/// CRM webhook channel. Without `webhook_url` the channel is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Bearer token or full `Authorization` header value
    #[serde(default)]
    pub auth_header: Option<String>,

    #[serde(default = "default_crm_timeout")]
    pub timeout_seconds: u64,

    /// Also post `lead_intake` when a lead is created from an inbound message
    #[serde(default = "default_true")]
    pub auto_intake: bool,
}

fn default_crm_timeout() -> u64 {
    timeouts::CRM_WEBHOOK_SECS
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            auth_header: None,
            timeout_seconds: default_crm_timeout(),
            auto_intake: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (LEAD_QUALIFIER__ prefix, `__` separator)
/// 2. config/{env}.toml (if env specified)
/// 3. config/default.toml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
