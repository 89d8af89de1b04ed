//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use lead_qualifier_agent::QualificationEngine;
use lead_qualifier_config::Settings;
use lead_qualifier_core::CompletionModel;
use lead_qualifier_integrations::build_channels;
use lead_qualifier_persistence::PersistenceLayer;
use lead_qualifier_transport::build_transport;

use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub engine: Arc<QualificationEngine>,
    pub persistence: PersistenceLayer,
    /// `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
    /// `scylla` or `memory`, reported by the health check
    pub storage_backend: &'static str,
}

impl AppState {
    /// Wire the engine from settings and already-initialized stores
    pub fn build(
        settings: Settings,
        persistence: PersistenceLayer,
        storage_backend: &'static str,
        completion: Option<Arc<dyn CompletionModel>>,
    ) -> Result<Self, ServerError> {
        let transport = build_transport(&settings.transport)
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        let channels = build_channels(&settings.notifications, persistence.audit.clone())
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        let mut builder = QualificationEngine::builder(settings.qualification.clone())
            .stores(
                persistence.leads.clone(),
                persistence.sessions.clone(),
                persistence.messages.clone(),
            )
            .transport(transport)
            .channels(channels);
        if let Some(model) = completion {
            builder = builder.completion_model(model);
        }
        let engine = builder.build().map_err(ServerError::from)?;

        Ok(Self {
            settings: Arc::new(settings),
            engine: Arc::new(engine),
            persistence,
            metrics: None,
            storage_backend,
        })
    }

    /// In-memory stores; for development and tests
    pub fn in_memory(settings: Settings) -> Result<Self, ServerError> {
        Self::build(settings, PersistenceLayer::in_memory(), "memory", None)
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
