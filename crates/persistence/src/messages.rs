//! ScyllaDB message log

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use lead_qualifier_core::{Message, MessageDirection, MessageStore, MessageType, Result};

use crate::{PersistenceError, ScyllaClient};

#[derive(Clone)]
pub struct ScyllaMessageStore {
    client: ScyllaClient,
}

impl ScyllaMessageStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageStore for ScyllaMessageStore {
    async fn append_message(&self, message: &Message) -> Result<()> {
        let query = format!(
            "INSERT INTO {}.messages (
                session_id, created_at, id, direction, content, message_type, transport_message_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    message.session_id.as_str(),
                    message.created_at.timestamp_millis(),
                    message.id.as_str(),
                    message.direction.as_str(),
                    message.content.as_str(),
                    message.message_type.as_str(),
                    message.transport_message_id.as_deref(),
                ),
            )
            .await
            .map_err(PersistenceError::from)?;

        if let Some(tid) = message.transport_message_id.as_deref() {
            let index = format!(
                "INSERT INTO {}.transport_messages (transport_message_id, message_id, session_id)
                 VALUES (?, ?, ?)",
                self.client.keyspace()
            );
            self.client
                .session()
                .query_unpaged(index, (tid, message.id.as_str(), message.session_id.as_str()))
                .await
                .map_err(PersistenceError::from)?;
        }

        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let query = format!(
            "SELECT session_id, created_at, id, direction, content, message_type, transport_message_id
             FROM {}.messages WHERE session_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (session_id,))
            .await
            .map_err(PersistenceError::from)?;

        let mut messages = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (session_id, created_at, id, direction, content, message_type, transport_message_id): (
                    String,
                    i64,
                    String,
                    String,
                    String,
                    String,
                    Option<String>,
                ) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

                let direction = MessageDirection::parse(&direction).ok_or_else(|| {
                    PersistenceError::InvalidData(format!("unknown direction '{}'", direction))
                })?;

                messages.push(Message {
                    id,
                    session_id,
                    direction,
                    content,
                    message_type: MessageType::parse(&message_type).unwrap_or_default(),
                    transport_message_id,
                    created_at: DateTime::from_timestamp_millis(created_at)
                        .unwrap_or_else(Utc::now),
                });
            }
        }

        Ok(messages)
    }

    async fn has_transport_message(&self, transport_message_id: &str) -> Result<bool> {
        let query = format!(
            "SELECT message_id FROM {}.transport_messages WHERE transport_message_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (transport_message_id,))
            .await
            .map_err(PersistenceError::from)?;

        Ok(result.rows.map(|rows| !rows.is_empty()).unwrap_or(false))
    }
}
