//! Notification channels for qualified leads
//!
//! Each channel implements the core `NotificationChannel` trait and is
//! dispatched independently by the completion fan-out.

pub mod audit;
pub mod crm;
pub mod email;

use std::sync::Arc;

use lead_qualifier_config::NotificationsConfig;
use lead_qualifier_core::NotificationChannel;
use lead_qualifier_persistence::AuditLog;
use thiserror::Error;

pub use audit::AuditChannel;
pub use crm::{CrmLead, CrmWebhookChannel, CrmWebhookPayload};
pub use email::EmailChannel;

/// Integration errors
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("CRM webhook error: {0}")]
    Crm(String),

    #[error("Audit error: {0}")]
    Audit(String),
}

impl From<IntegrationError> for lead_qualifier_core::Error {
    fn from(err: IntegrationError) -> Self {
        lead_qualifier_core::Error::Notification(err.to_string())
    }
}

/// Build the configured channels, in dispatch order: email, crm, audit
pub fn build_channels(
    config: &NotificationsConfig,
    audit_log: Arc<dyn AuditLog>,
) -> Result<Vec<Arc<dyn NotificationChannel>>, IntegrationError> {
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

    if config.email.enabled {
        channels.push(Arc::new(EmailChannel::new(&config.email)?));
    }
    channels.push(Arc::new(CrmWebhookChannel::new(&config.crm)?));
    if config.audit_enabled {
        channels.push(Arc::new(AuditChannel::new(audit_log)));
    }

    tracing::info!(
        channels = ?channels.iter().map(|c| c.name().to_string()).collect::<Vec<_>>(),
        "Notification channels configured"
    );
    Ok(channels)
}
