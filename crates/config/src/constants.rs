//! Centralized constants
//!
//! Default values shared by settings, adapters and the engine.

/// Service endpoints (defaults for local development)
pub mod endpoints {
    /// OpenAI-compatible API endpoint
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";

    /// Twilio REST API base
    pub const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

    /// Local ScyllaDB node
    pub const SCYLLA_DEFAULT: &str = "127.0.0.1:9042";
}

/// Timeouts (seconds)
pub mod timeouts {
    /// LLM request timeout
    pub const LLM_REQUEST_SECS: u64 = 30;

    /// Outbound messaging provider request timeout
    pub const TRANSPORT_SECS: u64 = 15;

    /// CRM webhook request timeout
    pub const CRM_WEBHOOK_SECS: u64 = 30;

    /// HTTP server request timeout
    pub const SERVER_REQUEST_SECS: u64 = 30;
}

/// Qualification defaults
pub mod qualification {
    /// Tenant assigned to leads created from inbound messages
    pub const DEFAULT_TENANT_ID: &str = "default";

    /// Source recorded for leads created from inbound messages
    pub const DEFAULT_LEAD_SOURCE: &str = "whatsapp";

    /// Transcript entries shown to the model in each prompt
    pub const HISTORY_WINDOW: usize = 6;

    /// Transcript length at which an unparseable readiness reply counts as ready
    /// (four user/assistant exchanges)
    pub const READINESS_FALLBACK_ENTRIES: usize = 8;
}

/// Notification defaults
pub mod notifications {
    /// Consultant address used when none is configured
    pub const DEFAULT_CONSULTANT_EMAIL: &str = "consultor@exemplo.com";

    /// CRM webhook event name
    pub const CRM_EVENT: &str = "qualified_lead";

    /// Audit event name for qualified leads
    pub const AUDIT_EVENT: &str = "lead_qualified";

    /// CRM and audit event name for leads created from inbound messages
    pub const INTAKE_EVENT: &str = "lead_intake";

    /// User agent sent to CRM webhooks
    pub const USER_AGENT: &str = "lead-qualifier/0.1";
}
