//! RecBlend Engine
//!
//! Serves blended offline/online recommendations over HTTP.
//!
//! # Architecture
//!
//! - **Offline store**: precomputed rankings loaded from a snapshot at startup
//! - **Online expander**: recent events expanded through the features store
//! - **API Server**: REST endpoints for offline, online and blended lists
//!
//! # Graceful Shutdown
//!
//! On SIGTERM or SIGINT in-flight requests complete, then the request
//! counters are written to the log.

use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recblend::api::{self, AppState};
use recblend::recommendation::clients::{http_client, EventsClient, FeaturesClient};
use recblend::recommendation::snapshot;
use recblend::{Config, ExpansionSettings, OfflineStore, OnlineExpander, RecommendationService, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with structured logging
    init_tracing();

    info!("═══════════════════════════════════════════════════════════════");
    info!("  🚀 RecBlend Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════════════════════════");

    // Load configuration
    let config = Config::from_env()?;
    info!("✅ Configuration loaded and validated");

    #[cfg(feature = "metrics")]
    init_metrics(config.metrics_port)?;

    // Load the offline snapshot
    info!("📦 Loading offline recommendations...");
    let table = snapshot::load_snapshot(&config.snapshot)?;
    let store = Arc::new(OfflineStore::new(table));
    info!("✅ Offline recommendations loaded");

    // Collaborator clients share one connection pool
    let client = http_client(config.collaborators.timeout)?;
    let expander = OnlineExpander::new(
        Arc::new(EventsClient::new(
            client.clone(),
            config.collaborators.events_url.clone(),
        )),
        Arc::new(FeaturesClient::new(
            client,
            config.collaborators.features_url.clone(),
        )),
        ExpansionSettings::from_config(&config),
    );

    let state = Arc::new(AppState {
        service: RecommendationService::new(store.clone(), expander),
        snapshot_config: config.snapshot.clone(),
        default_k: config.recommendation.default_k,
    });

    info!("  📡 API: http://{}:{}", config.api.host, config.api.port);
    info!(
        "  🔗 Health: http://{}:{}/health",
        config.api.host, config.api.port
    );

    api::start_server(state, &config.api, shutdown_signal()).await?;

    info!("📴 Stopping");
    store.stats().log_report();

    info!("👋 RecBlend Engine stopped gracefully");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("recblend=debug,recblend_engine=debug,tower_http=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .init();
}

/// Install the Prometheus exporter
#[cfg(feature = "metrics")]
fn init_metrics(port: u16) -> Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .map_err(|e| recblend::Error::Config {
            message: "Failed to install Prometheus exporter".into(),
            source: Some(Box::new(e)),
        })?;
    info!("📈 Prometheus metrics on port {}", port);
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("📴 Shutdown signal received");
}
