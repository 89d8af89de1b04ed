//! ScyllaDB session store
//!
//! Session writes are lightweight transactions conditioned on `version`, so
//! two writers racing on the same session cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::frame::response::result::Row;

use lead_qualifier_core::{
    ConversationSession, QualificationStep, Result, SessionContext, SessionStatus, SessionStore,
};

use crate::{PersistenceError, ScyllaClient};

const SESSION_COLUMNS: &str = "id, lead_id, status, step, context_json, version, created_at, updated_at";

#[derive(Clone)]
pub struct ScyllaSessionStore {
    client: ScyllaClient,
}

impl ScyllaSessionStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    /// Session ids for a lead, newest first
    async fn session_ids_for_lead(
        &self,
        lead_id: &str,
        limit: Option<i32>,
    ) -> std::result::Result<Vec<String>, PersistenceError> {
        let mut query = format!(
            "SELECT session_id FROM {}.sessions_by_lead WHERE lead_id = ?",
            self.client.keyspace()
        );
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }

        let result = self
            .client
            .session()
            .query_unpaged(query, (lead_id,))
            .await?;

        let mut ids = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (session_id,): (String,) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                ids.push(session_id);
            }
        }
        Ok(ids)
    }
}

fn row_to_session(row: Row) -> std::result::Result<ConversationSession, PersistenceError> {
    let (id, lead_id, status, step, context_json, version, created_at, updated_at): (
        String,
        String,
        String,
        String,
        String,
        i64,
        i64,
        i64,
    ) = row
        .into_typed()
        .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

    let status = SessionStatus::parse(&status)
        .ok_or_else(|| PersistenceError::InvalidData(format!("unknown session status '{}'", status)))?;
    let step = QualificationStep::parse(&step)
        .ok_or_else(|| PersistenceError::InvalidData(format!("unknown step '{}'", step)))?;
    let context: SessionContext = serde_json::from_str(&context_json)?;

    Ok(ConversationSession {
        id,
        lead_id,
        status,
        step,
        context,
        version: version.max(0) as u64,
        created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_else(Utc::now),
        updated_at: DateTime::from_timestamp_millis(updated_at).unwrap_or_else(Utc::now),
    })
}

#[async_trait]
impl SessionStore for ScyllaSessionStore {
    async fn create_session(&self, session: &ConversationSession) -> Result<ConversationSession> {
        let mut stored = session.clone();
        stored.version = 1;

        let query = format!(
            "INSERT INTO {}.sessions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS",
            self.client.keyspace(),
            SESSION_COLUMNS
        );
        let result = self
            .client
            .session()
            .query_unpaged(
                query,
                (
                    stored.id.as_str(),
                    stored.lead_id.as_str(),
                    stored.status.as_str(),
                    stored.step.as_str(),
                    stored.context.to_json()?,
                    stored.version as i64,
                    stored.created_at.timestamp_millis(),
                    stored.updated_at.timestamp_millis(),
                ),
            )
            .await
            .map_err(PersistenceError::from)?;

        if !crate::lwt_applied(result.rows)? {
            return Err(PersistenceError::Conflict(format!(
                "session {} already exists",
                stored.id
            ))
            .into());
        }

        let index = format!(
            "INSERT INTO {}.sessions_by_lead (lead_id, created_at, session_id) VALUES (?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                index,
                (
                    stored.lead_id.as_str(),
                    stored.created_at.timestamp_millis(),
                    stored.id.as_str(),
                ),
            )
            .await
            .map_err(PersistenceError::from)?;

        tracing::info!(session_id = %stored.id, lead_id = %stored.lead_id, "Session created");
        Ok(stored)
    }

    async fn get_session(&self, id: &str) -> Result<Option<ConversationSession>> {
        let query = format!(
            "SELECT {} FROM {}.sessions WHERE id = ?",
            SESSION_COLUMNS,
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (id,))
            .await
            .map_err(PersistenceError::from)?;

        match result.rows.and_then(|rows| rows.into_iter().next()) {
            Some(row) => Ok(Some(row_to_session(row)?)),
            None => Ok(None),
        }
    }

    async fn find_open_for_lead(&self, lead_id: &str) -> Result<Option<ConversationSession>> {
        for id in self.session_ids_for_lead(lead_id, None).await? {
            if let Some(session) = self.get_session(&id).await? {
                if session.is_open() {
                    return Ok(Some(session));
                }
            }
        }
        Ok(None)
    }

    async fn latest_for_lead(&self, lead_id: &str) -> Result<Option<ConversationSession>> {
        match self.session_ids_for_lead(lead_id, Some(1)).await?.first() {
            Some(id) => self.get_session(id).await,
            None => Ok(None),
        }
    }

    async fn save_session(
        &self,
        session: &ConversationSession,
        expected_version: u64,
    ) -> Result<ConversationSession> {
        let mut stored = session.clone();
        stored.version = expected_version + 1;
        stored.updated_at = Utc::now();

        let query = format!(
            "UPDATE {}.sessions SET status = ?, step = ?, context_json = ?, version = ?, updated_at = ?
             WHERE id = ? IF version = ?",
            self.client.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(
                query,
                (
                    stored.status.as_str(),
                    stored.step.as_str(),
                    stored.context.to_json()?,
                    stored.version as i64,
                    stored.updated_at.timestamp_millis(),
                    stored.id.as_str(),
                    expected_version as i64,
                ),
            )
            .await
            .map_err(PersistenceError::from)?;

        if !crate::lwt_applied(result.rows)? {
            tracing::warn!(
                session_id = %stored.id,
                expected_version,
                "Session write rejected: stale version"
            );
            return Err(PersistenceError::Conflict(format!(
                "session {} is no longer at version {}",
                stored.id, expected_version
            ))
            .into());
        }

        Ok(stored)
    }
}
