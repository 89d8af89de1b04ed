//! In-memory stores
//!
//! Used when persistence is disabled and by tests. Semantics match the
//! ScyllaDB stores, including compare-and-swap session writes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use lead_qualifier_core::{
    ConversationSession, Error, Lead, LeadStore, Message, MessageStore, Result, SessionStore,
};

use crate::audit::{AuditEvent, AuditLog};
use crate::PersistenceError;

#[derive(Default)]
pub struct InMemoryLeadStore {
    leads: RwLock<HashMap<String, Lead>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.leads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.read().is_empty()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn create_lead(&self, lead: &Lead) -> Result<()> {
        let mut leads = self.leads.write();
        let duplicate = leads
            .values()
            .any(|l| l.tenant_id == lead.tenant_id && l.phone == lead.phone);
        if duplicate || leads.contains_key(&lead.id) {
            return Err(Error::Conflict(format!(
                "lead with phone {} already exists for tenant {}",
                lead.phone, lead.tenant_id
            )));
        }
        leads.insert(lead.id.clone(), lead.clone());
        Ok(())
    }

    async fn get_lead(&self, id: &str) -> Result<Option<Lead>> {
        Ok(self.leads.read().get(id).cloned())
    }

    async fn find_by_phone(&self, tenant_id: &str, phone: &str) -> Result<Option<Lead>> {
        Ok(self
            .leads
            .read()
            .values()
            .find(|l| l.tenant_id == tenant_id && l.phone == phone)
            .cloned())
    }

    async fn update_lead(&self, lead: &Lead) -> Result<()> {
        let mut leads = self.leads.write();
        match leads.get_mut(&lead.id) {
            Some(stored) => {
                *stored = lead.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("lead {}", lead.id))),
        }
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, ConversationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sessions of a lead, oldest first
    pub fn sessions_for_lead(&self, lead_id: &str) -> Vec<ConversationSession> {
        let mut sessions: Vec<ConversationSession> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.lead_id == lead_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, session: &ConversationSession) -> Result<ConversationSession> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&session.id) {
            return Err(Error::Conflict(format!("session {} already exists", session.id)));
        }
        if sessions
            .values()
            .any(|s| s.lead_id == session.lead_id && s.is_open())
        {
            return Err(Error::Conflict(format!(
                "lead {} already has an open session",
                session.lead_id
            )));
        }

        let mut stored = session.clone();
        stored.version = 1;
        sessions.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_session(&self, id: &str) -> Result<Option<ConversationSession>> {
        Ok(self.sessions.read().get(id).cloned())
    }

    async fn find_open_for_lead(&self, lead_id: &str) -> Result<Option<ConversationSession>> {
        Ok(self
            .sessions
            .read()
            .values()
            .filter(|s| s.lead_id == lead_id && s.is_open())
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn latest_for_lead(&self, lead_id: &str) -> Result<Option<ConversationSession>> {
        Ok(self
            .sessions
            .read()
            .values()
            .filter(|s| s.lead_id == lead_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn save_session(
        &self,
        session: &ConversationSession,
        expected_version: u64,
    ) -> Result<ConversationSession> {
        let mut sessions = self.sessions.write();
        let stored = sessions
            .get_mut(&session.id)
            .ok_or_else(|| Error::NotFound(format!("session {}", session.id)))?;

        if stored.version != expected_version {
            return Err(Error::Conflict(format!(
                "session {} is at version {}, expected {}",
                session.id, stored.version, expected_version
            )));
        }

        let mut updated = session.clone();
        updated.version = expected_version + 1;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(updated)
    }
}

#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored message, in append order
    pub fn all(&self) -> Vec<Message> {
        self.messages.read().clone()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append_message(&self, message: &Message) -> Result<()> {
        self.messages.write().push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .messages
            .read()
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn has_transport_message(&self, transport_message_id: &str) -> Result<bool> {
        Ok(self
            .messages
            .read()
            .iter()
            .any(|m| m.transport_message_id.as_deref() == Some(transport_message_id)))
    }
}

#[derive(Default)]
pub struct InMemoryAuditLog {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, event: &AuditEvent) -> std::result::Result<(), PersistenceError> {
        self.events.write().push(event.clone());
        Ok(())
    }

    async fn list_for_lead(
        &self,
        lead_id: &str,
    ) -> std::result::Result<Vec<AuditEvent>, PersistenceError> {
        let mut events: Vec<AuditEvent> = self
            .events
            .read()
            .iter()
            .filter(|e| e.lead_id == lead_id)
            .cloned()
            .collect();
        events.reverse();
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_qualifier_core::{MessageType, QualificationStep, SessionContext, SessionStatus};

    fn lead(phone: &str) -> Lead {
        Lead::new("default", "Maria", phone, "whatsapp")
    }

    #[tokio::test]
    async fn test_lead_lookup_by_phone() {
        let store = InMemoryLeadStore::new();
        let maria = lead("+55 11 99999-0000");
        store.create_lead(&maria).await.unwrap();

        let found = store.find_by_phone("default", "+5511999990000").await.unwrap();
        assert_eq!(found.unwrap().id, maria.id);
        assert!(store.find_by_phone("other", "+5511999990000").await.unwrap().is_none());

        let dup = store.create_lead(&lead("+5511999990000")).await.unwrap_err();
        assert!(dup.is_conflict());
    }

    #[tokio::test]
    async fn test_update_unknown_lead() {
        let store = InMemoryLeadStore::new();
        let err = store.update_lead(&lead("+5511")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_session_compare_and_swap() {
        let store = InMemorySessionStore::new();
        let created = store
            .create_session(&ConversationSession::new("lead-1"))
            .await
            .unwrap();
        assert_eq!(created.version, 1);

        let mut next = created.clone();
        let mut ctx = SessionContext::default();
        ctx.current_step = QualificationStep::NetWorth;
        next.apply_context(ctx);

        let saved = store.save_session(&next, 1).await.unwrap();
        assert_eq!(saved.version, 2);
        assert_eq!(saved.step, QualificationStep::NetWorth);

        // A writer still holding version 1 loses.
        let err = store.save_session(&next, 1).await.unwrap_err();
        assert!(err.is_conflict());

        let stored = store.get_session(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_one_open_session_per_lead() {
        let store = InMemorySessionStore::new();
        let first = store
            .create_session(&ConversationSession::new("lead-1"))
            .await
            .unwrap();

        let err = store
            .create_session(&ConversationSession::new("lead-1"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let mut closed = first.clone();
        closed.status = SessionStatus::Closed;
        store.save_session(&closed, 1).await.unwrap();

        assert!(store.find_open_for_lead("lead-1").await.unwrap().is_none());
        let second = store
            .create_session(&ConversationSession::new("lead-1"))
            .await
            .unwrap();
        assert_eq!(
            store.find_open_for_lead("lead-1").await.unwrap().unwrap().id,
            second.id
        );
        assert_eq!(store.sessions_for_lead("lead-1").len(), 2);
    }

    #[tokio::test]
    async fn test_message_log() {
        let store = InMemoryMessageStore::new();
        store
            .append_message(&Message::inbound("s1", "oi", MessageType::Text, Some("SM1".into())))
            .await
            .unwrap();
        store
            .append_message(&Message::outbound("s1", "Olá!", None))
            .await
            .unwrap();
        store
            .append_message(&Message::outbound("s2", "outro", None))
            .await
            .unwrap();

        let messages = store.list_messages("s1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "oi");
        assert!(store.has_transport_message("SM1").await.unwrap());
        assert!(!store.has_transport_message("SM2").await.unwrap());
    }

    #[tokio::test]
    async fn test_audit_newest_first() {
        let log = InMemoryAuditLog::new();
        log.record(&AuditEvent::new("t", "lead-1", "first", serde_json::json!({})))
            .await
            .unwrap();
        log.record(&AuditEvent::new("t", "lead-1", "second", serde_json::json!({"score": 80})))
            .await
            .unwrap();

        let events = log.list_for_lead("lead-1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "second");
        assert!(log.list_for_lead("lead-2").await.unwrap().is_empty());
    }
}
