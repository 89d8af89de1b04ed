//! ScyllaDB schema creation
//!
//! Timestamps are stored as BIGINT epoch milliseconds.

use crate::error::PersistenceError;
use scylla::Session;

/// Create the keyspace if it doesn't exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Table definitions, in creation order
fn table_statements(keyspace: &str) -> Vec<(&'static str, String)> {
    vec![
        (
            "leads",
            format!(
                r#"
        CREATE TABLE IF NOT EXISTS {}.leads (
            id TEXT,
            tenant_id TEXT,
            name TEXT,
            phone TEXT,
            email TEXT,
            source TEXT,
            status TEXT,
            score INT,
            created_at BIGINT,
            updated_at BIGINT,
            qualified_at BIGINT,
            PRIMARY KEY (id)
        )"#,
                keyspace
            ),
        ),
        (
            "leads_by_phone",
            format!(
                r#"
        CREATE TABLE IF NOT EXISTS {}.leads_by_phone (
            tenant_id TEXT,
            phone TEXT,
            lead_id TEXT,
            PRIMARY KEY ((tenant_id, phone))
        )"#,
                keyspace
            ),
        ),
        (
            "sessions",
            format!(
                r#"
        CREATE TABLE IF NOT EXISTS {}.sessions (
            id TEXT,
            lead_id TEXT,
            status TEXT,
            step TEXT,
            context_json TEXT,
            version BIGINT,
            created_at BIGINT,
            updated_at BIGINT,
            PRIMARY KEY (id)
        )"#,
                keyspace
            ),
        ),
        (
            "sessions_by_lead",
            format!(
                r#"
        CREATE TABLE IF NOT EXISTS {}.sessions_by_lead (
            lead_id TEXT,
            created_at BIGINT,
            session_id TEXT,
            PRIMARY KEY ((lead_id), created_at, session_id)
        ) WITH CLUSTERING ORDER BY (created_at DESC, session_id ASC)"#,
                keyspace
            ),
        ),
        (
            "messages",
            format!(
                r#"
        CREATE TABLE IF NOT EXISTS {}.messages (
            session_id TEXT,
            created_at BIGINT,
            id TEXT,
            direction TEXT,
            content TEXT,
            message_type TEXT,
            transport_message_id TEXT,
            PRIMARY KEY ((session_id), created_at, id)
        ) WITH CLUSTERING ORDER BY (created_at ASC, id ASC)"#,
                keyspace
            ),
        ),
        (
            "transport_messages",
            format!(
                r#"
        CREATE TABLE IF NOT EXISTS {}.transport_messages (
            transport_message_id TEXT,
            message_id TEXT,
            session_id TEXT,
            PRIMARY KEY (transport_message_id)
        )"#,
                keyspace
            ),
        ),
        (
            "audit_log",
            format!(
                r#"
        CREATE TABLE IF NOT EXISTS {}.audit_log (
            lead_id TEXT,
            created_at BIGINT,
            id UUID,
            tenant_id TEXT,
            event_type TEXT,
            details TEXT,
            PRIMARY KEY ((lead_id), created_at, id)
        ) WITH CLUSTERING ORDER BY (created_at DESC, id DESC)"#,
                keyspace
            ),
        ),
    ]
}

/// Create all required tables
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    for (name, statement) in table_statements(keyspace) {
        session.query_unpaged(statement, &[]).await.map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create {} table: {}", name, e))
        })?;
    }

    tracing::info!("All tables created successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_use_keyspace() {
        let statements = table_statements("lq_test");
        assert_eq!(statements.len(), 7);
        for (name, statement) in &statements {
            assert!(statement.contains(&format!("lq_test.{} (", name)));
        }
    }
}
