//! CRM webhook channel
//!
//! Posts a `qualified_lead` event as JSON, and a `lead_intake` event for
//! leads created from inbound messages unless `auto_intake` is off. Without a
//! configured URL the channel reports `Skipped`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use lead_qualifier_config::constants::notifications::{CRM_EVENT, INTAKE_EVENT, USER_AGENT};
use lead_qualifier_config::CrmConfig;
use lead_qualifier_core::{ChannelOutcome, Lead, NotificationChannel, NotificationPayload, Result};

use crate::IntegrationError;

const SOURCE: &str = "lead-qualifier";

/// Body posted to the CRM
#[derive(Debug, Clone, Serialize)]
pub struct CrmWebhookPayload {
    pub event: &'static str,
    pub timestamp: DateTime<Utc>,
    pub lead: CrmLead,
    pub source: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrmLead {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub score: u8,
    pub status: &'static str,
    pub origin: String,
    pub summary: String,
    pub qualified_at: Option<DateTime<Utc>>,
}

impl From<&NotificationPayload> for CrmWebhookPayload {
    fn from(payload: &NotificationPayload) -> Self {
        Self {
            event: CRM_EVENT,
            timestamp: Utc::now(),
            lead: CrmLead {
                id: payload.lead_id.clone(),
                name: payload.name.clone(),
                email: payload.email.clone(),
                phone: payload.phone.clone(),
                score: payload.score,
                status: if payload.qualified {
                    "qualified"
                } else {
                    "disqualified"
                },
                origin: payload.source.clone(),
                summary: payload.summary.clone(),
                qualified_at: payload.qualified_at,
            },
            source: SOURCE,
        }
    }
}

impl CrmWebhookPayload {
    /// Newly created lead, before any qualification
    pub fn intake(lead: &Lead) -> Self {
        Self {
            event: INTAKE_EVENT,
            timestamp: Utc::now(),
            lead: CrmLead {
                id: lead.id.clone(),
                name: lead.name.clone(),
                email: lead.email.clone(),
                phone: lead.phone.clone(),
                score: lead.score,
                status: lead.status.as_str(),
                origin: lead.source.clone(),
                summary: String::new(),
                qualified_at: None,
            },
            source: SOURCE,
        }
    }
}

pub struct CrmWebhookChannel {
    client: Client,
    url: Option<String>,
    authorization: Option<String>,
    auto_intake: bool,
}

impl CrmWebhookChannel {
    pub fn new(config: &CrmConfig) -> std::result::Result<Self, IntegrationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IntegrationError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            url: config.webhook_url.clone().filter(|u| !u.trim().is_empty()),
            authorization: config.auth_header.as_deref().map(bearer),
            auto_intake: config.auto_intake,
        })
    }

    async fn post(&self, url: &str, body: &CrmWebhookPayload) -> Result<()> {
        let mut request = self.client.post(url).json(body);
        if let Some(auth) = &self.authorization {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IntegrationError::Crm(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Crm(format!("HTTP {}: {}", status, body)).into());
        }
        Ok(())
    }
}

/// Accept either a bare token or a full `Bearer ...` value
fn bearer(value: &str) -> String {
    if value.starts_with("Bearer ") {
        value.to_string()
    } else {
        format!("Bearer {}", value)
    }
}

#[async_trait]
impl NotificationChannel for CrmWebhookChannel {
    fn name(&self) -> &str {
        "crm"
    }

    async fn deliver(&self, payload: &NotificationPayload) -> Result<ChannelOutcome> {
        let Some(url) = &self.url else {
            tracing::debug!(lead_id = %payload.lead_id, "CRM webhook not configured, skipping");
            return Ok(ChannelOutcome::Skipped);
        };

        self.post(url, &CrmWebhookPayload::from(payload)).await?;
        tracing::info!(lead_id = %payload.lead_id, "Lead sent to CRM");
        Ok(ChannelOutcome::Delivered)
    }

    async fn intake(&self, lead: &Lead) -> Result<ChannelOutcome> {
        let Some(url) = self.url.as_deref().filter(|_| self.auto_intake) else {
            return Ok(ChannelOutcome::Skipped);
        };

        self.post(url, &CrmWebhookPayload::intake(lead)).await?;
        tracing::info!(lead_id = %lead.id, "Lead intake sent to CRM");
        Ok(ChannelOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_qualifier_core::{AnswerMap, Lead};

    fn payload() -> NotificationPayload {
        let mut lead = Lead::new("default", "Maria", "+5511999990000", "whatsapp")
            .with_email("maria@exemplo.com");
        lead.record_verdict(85, true);
        NotificationPayload::new(&lead, &AnswerMap::new(), true, "Patrimônio: X".to_string())
    }

    #[test]
    fn test_bearer_prefix() {
        assert_eq!(bearer("abc"), "Bearer abc");
        assert_eq!(bearer("Bearer abc"), "Bearer abc");
    }

    #[test]
    fn test_webhook_body() {
        let body = serde_json::to_value(CrmWebhookPayload::from(&payload())).unwrap();
        assert_eq!(body["event"], "qualified_lead");
        assert_eq!(body["lead"]["score"], 85);
        assert_eq!(body["lead"]["status"], "qualified");
        assert_eq!(body["lead"]["email"], "maria@exemplo.com");
        assert_eq!(body["source"], "lead-qualifier");
    }

    #[tokio::test]
    async fn test_unconfigured_is_skipped() {
        let channel = CrmWebhookChannel::new(&CrmConfig::default()).unwrap();
        let outcome = channel.deliver(&payload()).await.unwrap();
        assert_eq!(outcome, ChannelOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_an_error() {
        let config = CrmConfig {
            webhook_url: Some("http://127.0.0.1:1/hook".to_string()),
            auth_header: Some("token".to_string()),
            timeout_seconds: 2,
            auto_intake: true,
        };
        let channel = CrmWebhookChannel::new(&config).unwrap();
        let err = channel.deliver(&payload()).await.unwrap_err();
        assert!(matches!(err, lead_qualifier_core::Error::Notification(_)));
    }

    #[test]
    fn test_intake_body() {
        let lead = Lead::new("default", "Maria", "+5511999990000", "whatsapp");
        let body = serde_json::to_value(CrmWebhookPayload::intake(&lead)).unwrap();
        assert_eq!(body["event"], "lead_intake");
        assert_eq!(body["lead"]["status"], "new");
        assert_eq!(body["lead"]["score"], 0);
        assert_eq!(body["lead"]["origin"], "whatsapp");
    }

    #[tokio::test]
    async fn test_intake_disabled_is_skipped() {
        let config = CrmConfig {
            webhook_url: Some("http://127.0.0.1:1/hook".to_string()),
            auto_intake: false,
            ..CrmConfig::default()
        };
        let channel = CrmWebhookChannel::new(&config).unwrap();
        let lead = Lead::new("default", "Maria", "+5511999990000", "whatsapp");
        assert_eq!(channel.intake(&lead).await.unwrap(), ChannelOutcome::Skipped);
    }
}
