//! HTTP Endpoints
//!
//! Messaging webhooks, manual qualification start and session inspection.

use std::future::Future;
use std::time::Duration;

use axum::{
    extract::{Form, Json, Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use lead_qualifier_agent::{AgentError, InboundOutcome, SessionView, StartOutcome};
use lead_qualifier_core::{InboundMessage, LeadStore};
use lead_qualifier_transport::TwilioWebhook;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

/// Header selecting the tenant for leads created by a webhook
pub const TENANT_HEADER: &str = "x-tenant-id";

const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.settings.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let timeout = Duration::from_secs(server.timeout_seconds);

    Router::new()
        // Messaging webhooks
        .route("/webhooks/inbound", post(inbound_webhook))
        .route("/webhooks/twilio", post(twilio_webhook))
        // Manual trigger
        .route("/api/leads/:lead_id/qualification", post(start_qualification))
        // Sessions
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/pause", post(pause_session))
        .route("/api/sessions/:id/resume", post(resume_session))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return layer.allow_origin(HeaderValue::from_static("http://localhost:3000"));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    layer.allow_origin(parsed_origins)
}

/// Run an engine call on its own task.
///
/// The request future is dropped on client disconnect or timeout; the turn
/// keeps running, so a saved session is always followed by its send or its
/// rollback.
async fn detached<T, F>(call: F) -> Result<T, ServerError>
where
    F: Future<Output = Result<T, AgentError>> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::spawn(call).await??)
}

fn tenant_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Provider-neutral inbound message
async fn inbound_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(inbound): Json<InboundMessage>,
) -> Result<Json<InboundOutcome>, ServerError> {
    let tenant = tenant_from(&headers);
    let engine = state.engine.clone();
    let outcome =
        detached(async move { engine.handle_inbound(&inbound, tenant.as_deref()).await }).await?;
    Ok(Json(outcome))
}

/// Twilio WhatsApp webhook; replies go out through the REST API, so the
/// TwiML response is always empty
async fn twilio_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(hook): Form<TwilioWebhook>,
) -> Result<impl IntoResponse, ServerError> {
    let tenant = tenant_from(&headers);
    let inbound = InboundMessage::from(hook);
    let engine = state.engine.clone();
    let outcome =
        detached(async move { engine.handle_inbound(&inbound, tenant.as_deref()).await }).await?;

    tracing::debug!(outcome = ?outcome, "Twilio webhook handled");
    Ok(([(header::CONTENT_TYPE, "text/xml")], EMPTY_TWIML))
}

/// Manual start request
#[derive(Debug, Default, Deserialize)]
struct StartRequest {
    /// Overrides the lead's stored phone
    #[serde(default)]
    phone: Option<String>,
}

async fn start_qualification(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
    body: Option<Json<StartRequest>>,
) -> Result<(StatusCode, Json<StartOutcome>), ServerError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let engine = state.engine.clone();
    let started = detached(async move {
        engine
            .start_qualification(&lead_id, request.phone.as_deref())
            .await
    })
    .await?;
    Ok((StatusCode::CREATED, Json(started)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ServerError> {
    Ok(Json(state.engine.session_view(&id).await?))
}

async fn pause_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ServerError> {
    Ok(Json(state.engine.pause_session(&id).await?))
}

async fn resume_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ServerError> {
    Ok(Json(state.engine.resume_session(&id).await?))
}

/// Liveness plus a summary of the wiring
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.storage_backend,
        "transport": state.engine.transport_provider(),
        "strategy": state.engine.config().strategy,
        "channels": state.engine.channel_names(),
        "busy_leads": state.engine.busy_leads(),
    }))
}

/// Ready once the lead store answers a lookup
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let probe = tokio::time::timeout(
        Duration::from_secs(2),
        state.persistence.leads.get_lead("readiness-probe"),
    )
    .await;

    let (ready, storage) = match probe {
        Ok(Ok(_)) => (true, "ok".to_string()),
        Ok(Err(e)) => (false, e.to_string()),
        Err(_) => (false, "timeout".to_string()),
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": ready,
            "checks": { "storage": storage },
        })),
    )
}
