//! Persistence layer for the lead qualification engine
//!
//! Provides storage for:
//! - Leads (with a per-tenant phone index)
//! - Conversation sessions (versioned, compare-and-swap writes)
//! - Append-only message log
//! - Audit events
//!
//! Both ScyllaDB and in-memory implementations are available.

pub mod audit;
pub mod client;
pub mod error;
pub mod leads;
pub mod memory;
pub mod messages;
pub mod schema;
pub mod sessions;

use std::sync::Arc;

use scylla::frame::response::result::Row;

use lead_qualifier_core::{LeadStore, MessageStore, SessionStore};

pub use audit::{AuditEvent, AuditLog, ScyllaAuditLog};
pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use leads::ScyllaLeadStore;
pub use memory::{InMemoryAuditLog, InMemoryLeadStore, InMemoryMessageStore, InMemorySessionStore};
pub use messages::ScyllaMessageStore;
pub use sessions::ScyllaSessionStore;

/// Initialize the ScyllaDB-backed persistence layer
pub async fn init(config: ScyllaConfig) -> Result<PersistenceLayer, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;

    Ok(PersistenceLayer {
        leads: Arc::new(ScyllaLeadStore::new(client.clone())),
        sessions: Arc::new(ScyllaSessionStore::new(client.clone())),
        messages: Arc::new(ScyllaMessageStore::new(client.clone())),
        audit: Arc::new(ScyllaAuditLog::new(client)),
    })
}

/// Combined persistence layer with all stores
#[derive(Clone)]
pub struct PersistenceLayer {
    pub leads: Arc<dyn LeadStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub messages: Arc<dyn MessageStore>,
    pub audit: Arc<dyn AuditLog>,
}

impl PersistenceLayer {
    /// Process-local stores; contents are lost on restart
    pub fn in_memory() -> Self {
        Self {
            leads: Arc::new(InMemoryLeadStore::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
            messages: Arc::new(InMemoryMessageStore::new()),
            audit: Arc::new(InMemoryAuditLog::new()),
        }
    }
}

/// Read the `[applied]` column of a lightweight-transaction result
pub(crate) fn lwt_applied(rows: Option<Vec<Row>>) -> Result<bool, PersistenceError> {
    let row = rows
        .and_then(|rows| rows.into_iter().next())
        .ok_or_else(|| PersistenceError::InvalidData("empty LWT result".to_string()))?;

    row.columns
        .first()
        .and_then(|value| value.as_ref())
        .and_then(|value| value.as_boolean())
        .ok_or_else(|| PersistenceError::InvalidData("missing [applied] column".to_string()))
}
