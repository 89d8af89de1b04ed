//! Lead Qualifier Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use lead_qualifier_config::{load_settings, Settings};
use lead_qualifier_core::CompletionModel;
use lead_qualifier_llm::{CompletionAdapter, OpenAIBackend, OpenAIConfig};
use lead_qualifier_persistence::{PersistenceLayer, ScyllaConfig};
use lead_qualifier_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.toml > config/default.toml > defaults
    let env = std::env::var("LEAD_QUALIFIER_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting Lead Qualifier v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    config.validate()?;

    let metrics_handle = if config.observability.metrics_enabled {
        let handle = init_metrics()?;
        tracing::info!("Initialized Prometheus metrics at /metrics");
        Some(handle)
    } else {
        None
    };

    let (persistence, backend) = init_persistence(&config).await?;
    let completion = init_completion_model(&config)?;

    let mut state = AppState::build(config.clone(), persistence, backend, completion)?;
    if let Some(handle) = metrics_handle {
        state = state.with_metrics(handle);
    }

    tracing::info!(
        storage = backend,
        transport = state.engine.transport_provider(),
        strategy = ?config.qualification.strategy,
        channels = ?state.engine.channel_names(),
        "Initialized application state"
    );

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// ScyllaDB when enabled; in-memory otherwise. Outside strict environments a
/// failed connection falls back to memory.
async fn init_persistence(
    config: &Settings,
) -> Result<(PersistenceLayer, &'static str), Box<dyn std::error::Error>> {
    if !config.persistence.enabled {
        tracing::info!("Persistence disabled, using in-memory stores");
        return Ok((PersistenceLayer::in_memory(), "memory"));
    }

    tracing::info!("Initializing ScyllaDB persistence layer...");
    match lead_qualifier_persistence::init(ScyllaConfig::from(&config.persistence)).await {
        Ok(persistence) => {
            tracing::info!(
                hosts = ?config.persistence.scylla_hosts,
                keyspace = %config.persistence.keyspace,
                "ScyllaDB persistence initialized"
            );
            Ok((persistence, "scylla"))
        }
        Err(e) if config.environment.is_strict() => Err(e.into()),
        Err(e) => {
            tracing::error!(
                "Failed to initialize ScyllaDB: {}. Falling back to in-memory.",
                e
            );
            Ok((PersistenceLayer::in_memory(), "memory"))
        }
    }
}

/// Completion model, built only when some tenant uses the natural-language strategy
fn init_completion_model(
    config: &Settings,
) -> Result<Option<Arc<dyn CompletionModel>>, Box<dyn std::error::Error>> {
    if !config.qualification.uses_natural_language() {
        return Ok(None);
    }

    let backend = OpenAIBackend::new(OpenAIConfig::from(&config.llm))?;
    tracing::info!(
        endpoint = %config.llm.endpoint,
        model = %config.llm.model,
        "Completion model configured"
    );
    Ok(Some(Arc::new(CompletionAdapter::new(backend))))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("lead_qualifier={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
