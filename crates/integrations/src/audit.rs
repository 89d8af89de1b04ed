//! Audit-log notification channel

use std::sync::Arc;

use async_trait::async_trait;

use lead_qualifier_config::constants::notifications::{AUDIT_EVENT, INTAKE_EVENT};
use lead_qualifier_core::{ChannelOutcome, Lead, NotificationChannel, NotificationPayload, Result};
use lead_qualifier_persistence::{AuditEvent, AuditLog};

use crate::IntegrationError;

/// Writes a `lead_qualified` event for every qualified lead and a
/// `lead_intake` event for every lead created from an inbound message
pub struct AuditChannel {
    log: Arc<dyn AuditLog>,
}

impl AuditChannel {
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl NotificationChannel for AuditChannel {
    fn name(&self) -> &str {
        "audit"
    }

    async fn deliver(&self, payload: &NotificationPayload) -> Result<ChannelOutcome> {
        let details = serde_json::to_value(payload)?;
        let event = AuditEvent::new(&payload.tenant_id, &payload.lead_id, AUDIT_EVENT, details);

        self.log
            .record(&event)
            .await
            .map_err(|e| IntegrationError::Audit(e.to_string()))?;

        tracing::debug!(lead_id = %payload.lead_id, "Qualification audit event written");
        Ok(ChannelOutcome::Delivered)
    }

    async fn intake(&self, lead: &Lead) -> Result<ChannelOutcome> {
        let details = serde_json::json!({
            "origin": lead.source,
            "phone": lead.phone,
            "name": lead.name,
        });
        let event = AuditEvent::new(&lead.tenant_id, &lead.id, INTAKE_EVENT, details);

        self.log
            .record(&event)
            .await
            .map_err(|e| IntegrationError::Audit(e.to_string()))?;
        Ok(ChannelOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_qualifier_core::AnswerMap;
    use lead_qualifier_persistence::InMemoryAuditLog;

    #[tokio::test]
    async fn test_writes_event_with_payload() {
        let log = Arc::new(InMemoryAuditLog::new());
        let channel = AuditChannel::new(log.clone());

        let mut lead = Lead::new("acme", "Maria", "+5511999990000", "whatsapp");
        lead.record_verdict(80, true);
        let payload = NotificationPayload::new(&lead, &AnswerMap::new(), true, String::new());

        let outcome = channel.deliver(&payload).await.unwrap();
        assert_eq!(outcome, ChannelOutcome::Delivered);

        let events = log.list_for_lead(&lead.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "lead_qualified");
        assert_eq!(events[0].tenant_id, "acme");
        assert_eq!(events[0].details["score"], 80);
    }

    #[tokio::test]
    async fn test_intake_event() {
        let log = Arc::new(InMemoryAuditLog::new());
        let channel = AuditChannel::new(log.clone());
        let lead = Lead::new("acme", "João", "+5511888880000", "whatsapp");

        channel.intake(&lead).await.unwrap();

        let events = log.list_for_lead(&lead.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "lead_intake");
        assert_eq!(events[0].details["origin"], "whatsapp");
    }
}
