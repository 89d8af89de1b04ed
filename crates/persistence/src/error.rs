//! Persistence errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Conditional write rejected (stale version or duplicate key)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<scylla::transport::errors::NewSessionError> for PersistenceError {
    fn from(err: scylla::transport::errors::NewSessionError) -> Self {
        PersistenceError::Connection(err.to_string())
    }
}

impl From<scylla::transport::errors::QueryError> for PersistenceError {
    fn from(err: scylla::transport::errors::QueryError) -> Self {
        PersistenceError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::InvalidData(err.to_string())
    }
}

impl From<PersistenceError> for lead_qualifier_core::Error {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Conflict(msg) => lead_qualifier_core::Error::Conflict(msg),
            PersistenceError::NotFound(msg) => lead_qualifier_core::Error::NotFound(msg),
            other => lead_qualifier_core::Error::Storage(other.to_string()),
        }
    }
}
