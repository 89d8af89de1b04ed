//! ScyllaDB lead store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::frame::response::result::Row;

use lead_qualifier_core::{Lead, LeadStatus, LeadStore, Result};

use crate::{PersistenceError, ScyllaClient};

const LEAD_COLUMNS: &str = "id, tenant_id, name, phone, email, source, status, score, \
                            created_at, updated_at, qualified_at";

#[derive(Clone)]
pub struct ScyllaLeadStore {
    client: ScyllaClient,
}

impl ScyllaLeadStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    async fn write_lead(&self, lead: &Lead) -> std::result::Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.leads ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace(),
            LEAD_COLUMNS
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    lead.id.as_str(),
                    lead.tenant_id.as_str(),
                    lead.name.as_str(),
                    lead.phone.as_str(),
                    lead.email.as_deref(),
                    lead.source.as_str(),
                    lead.status.as_str(),
                    lead.score as i32,
                    lead.created_at.timestamp_millis(),
                    lead.updated_at.timestamp_millis(),
                    lead.qualified_at.map(|t| t.timestamp_millis()),
                ),
            )
            .await?;
        Ok(())
    }
}

fn row_to_lead(row: Row) -> std::result::Result<Lead, PersistenceError> {
    let (
        id,
        tenant_id,
        name,
        phone,
        email,
        source,
        status,
        score,
        created_at,
        updated_at,
        qualified_at,
    ): (
        String,
        String,
        String,
        String,
        Option<String>,
        String,
        String,
        i32,
        i64,
        i64,
        Option<i64>,
    ) = row
        .into_typed()
        .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

    let status = LeadStatus::parse(&status)
        .ok_or_else(|| PersistenceError::InvalidData(format!("unknown lead status '{}'", status)))?;

    Ok(Lead {
        id,
        tenant_id,
        name,
        phone,
        email,
        source,
        status,
        score: score.clamp(0, 100) as u8,
        created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_else(Utc::now),
        updated_at: DateTime::from_timestamp_millis(updated_at).unwrap_or_else(Utc::now),
        qualified_at: qualified_at.and_then(DateTime::from_timestamp_millis),
    })
}

#[async_trait]
impl LeadStore for ScyllaLeadStore {
    async fn create_lead(&self, lead: &Lead) -> Result<()> {
        let index = format!(
            "INSERT INTO {}.leads_by_phone (tenant_id, phone, lead_id) VALUES (?, ?, ?) IF NOT EXISTS",
            self.client.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(
                index,
                (lead.tenant_id.as_str(), lead.phone.as_str(), lead.id.as_str()),
            )
            .await
            .map_err(PersistenceError::from)?;

        if !crate::lwt_applied(result.rows)? {
            return Err(PersistenceError::Conflict(format!(
                "lead with phone {} already exists for tenant {}",
                lead.phone, lead.tenant_id
            ))
            .into());
        }

        self.write_lead(lead).await?;
        tracing::info!(lead_id = %lead.id, tenant_id = %lead.tenant_id, "Lead created");
        Ok(())
    }

    async fn get_lead(&self, id: &str) -> Result<Option<Lead>> {
        let query = format!(
            "SELECT {} FROM {}.leads WHERE id = ?",
            LEAD_COLUMNS,
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (id,))
            .await
            .map_err(PersistenceError::from)?;

        match result.rows.and_then(|rows| rows.into_iter().next()) {
            Some(row) => Ok(Some(row_to_lead(row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_phone(&self, tenant_id: &str, phone: &str) -> Result<Option<Lead>> {
        let query = format!(
            "SELECT lead_id FROM {}.leads_by_phone WHERE tenant_id = ? AND phone = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (tenant_id, phone))
            .await
            .map_err(PersistenceError::from)?;

        let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) else {
            return Ok(None);
        };
        let (lead_id,): (String,) = row
            .into_typed()
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        self.get_lead(&lead_id).await
    }

    async fn update_lead(&self, lead: &Lead) -> Result<()> {
        self.write_lead(lead).await?;
        tracing::debug!(lead_id = %lead.id, status = %lead.status.as_str(), "Lead updated");
        Ok(())
    }
}
