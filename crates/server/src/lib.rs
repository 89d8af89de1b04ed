//! Lead Qualifier Server
//!
//! HTTP ingress for the qualification engine: messaging webhooks, manual
//! start, session inspection, health and Prometheus metrics.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use lead_qualifier_agent::AgentError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::LeadNotFound(_)
            | AgentError::SessionNotFound(_)
            | AgentError::NotFound(_) => ServerError::NotFound(err.to_string()),
            AgentError::SessionAlreadyActive(_)
            | AgentError::Conflict(_)
            | AgentError::InvalidState(_) => ServerError::Conflict(err.to_string()),
            AgentError::InvalidInput(_) => ServerError::InvalidRequest(err.to_string()),
            AgentError::Delivery(_) | AgentError::Llm(_) | AgentError::Notification(_) => {
                ServerError::Upstream(err.to_string())
            }
            AgentError::Storage(_) | AgentError::Configuration(_) => {
                ServerError::Internal(err.to_string())
            }
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("engine task failed: {}", err))
    }
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
