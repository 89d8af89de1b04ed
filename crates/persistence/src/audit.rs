//! Audit trail of qualification events

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{PersistenceError, ScyllaClient};

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub tenant_id: String,
    pub lead_id: String,
    pub event_type: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        tenant_id: impl Into<String>,
        lead_id: impl Into<String>,
        event_type: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            lead_id: lead_id.into(),
            event_type: event_type.into(),
            details,
            created_at: Utc::now(),
        }
    }
}

/// Append-only audit log
#[async_trait]
pub trait AuditLog: Send + Sync + 'static {
    async fn record(&self, event: &AuditEvent) -> Result<(), PersistenceError>;

    /// Events for a lead, newest first
    async fn list_for_lead(&self, lead_id: &str) -> Result<Vec<AuditEvent>, PersistenceError>;
}

/// ScyllaDB-backed audit log
#[derive(Clone)]
pub struct ScyllaAuditLog {
    client: ScyllaClient,
}

impl ScyllaAuditLog {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuditLog for ScyllaAuditLog {
    async fn record(&self, event: &AuditEvent) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.audit_log (lead_id, created_at, id, tenant_id, event_type, details)
             VALUES (?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    event.lead_id.as_str(),
                    event.created_at.timestamp_millis(),
                    event.id,
                    event.tenant_id.as_str(),
                    event.event_type.as_str(),
                    serde_json::to_string(&event.details)?,
                ),
            )
            .await?;

        tracing::debug!(
            lead_id = %event.lead_id,
            event_type = %event.event_type,
            "Audit event recorded"
        );
        Ok(())
    }

    async fn list_for_lead(&self, lead_id: &str) -> Result<Vec<AuditEvent>, PersistenceError> {
        let query = format!(
            "SELECT lead_id, created_at, id, tenant_id, event_type, details
             FROM {}.audit_log WHERE lead_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (lead_id,))
            .await?;

        let mut events = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (lead_id, created_at, id, tenant_id, event_type, details): (
                    String,
                    i64,
                    Uuid,
                    String,
                    String,
                    Option<String>,
                ) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

                events.push(AuditEvent {
                    id,
                    tenant_id,
                    lead_id,
                    event_type,
                    details: details
                        .and_then(|s| serde_json::from_str(&s).ok())
                        .unwrap_or(Value::Null),
                    created_at: DateTime::from_timestamp_millis(created_at)
                        .unwrap_or_else(Utc::now),
                });
            }
        }

        Ok(events)
    }
}
