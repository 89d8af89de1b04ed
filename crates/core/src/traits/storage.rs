//! Record storage capabilities

use async_trait::async_trait;

use crate::conversation::{ConversationSession, Message};
use crate::lead::Lead;
use crate::Result;

/// Lead records
#[async_trait]
pub trait LeadStore: Send + Sync + 'static {
    async fn create_lead(&self, lead: &Lead) -> Result<()>;

    async fn get_lead(&self, id: &str) -> Result<Option<Lead>>;

    /// Look up by normalized phone number within a tenant
    async fn find_by_phone(&self, tenant_id: &str, phone: &str) -> Result<Option<Lead>>;

    async fn update_lead(&self, lead: &Lead) -> Result<()>;
}

/// Versioned conversation sessions
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Insert a new session at version 1 and return the stored record
    async fn create_session(&self, session: &ConversationSession) -> Result<ConversationSession>;

    async fn get_session(&self, id: &str) -> Result<Option<ConversationSession>>;

    /// The lead's session that is not closed, if any
    async fn find_open_for_lead(&self, lead_id: &str) -> Result<Option<ConversationSession>>;

    /// Most recently created session for the lead, any status
    async fn latest_for_lead(&self, lead_id: &str) -> Result<Option<ConversationSession>>;

    /// Compare-and-swap write.
    ///
    /// Stores `session`'s content only if the stored version equals
    /// `expected_version`, and returns the stored record with the version
    /// incremented. A stale version is `Error::Conflict`.
    async fn save_session(
        &self,
        session: &ConversationSession,
        expected_version: u64,
    ) -> Result<ConversationSession>;
}

/// Append-only message log
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    async fn append_message(&self, message: &Message) -> Result<()>;

    /// Messages of a session in creation order
    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>>;

    /// True when an inbound message with this provider id was already recorded
    async fn has_transport_message(&self, transport_message_id: &str) -> Result<bool>;
}
