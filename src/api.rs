//! HTTP API Server for Recommendations
//!
//! Exposes offline, online and blended recommendations plus stats and
//! snapshot reload endpoints.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::{ApiConfig, SnapshotConfig};
use crate::error::{Error, Result};
use crate::recommendation::{snapshot, RankedList, RecommendationService, TableKind, UserId};

/// Shared application state
pub struct AppState {
    pub service: RecommendationService,
    pub snapshot_config: SnapshotConfig,
    /// List size used when a request omits `k`
    pub default_k: i64,
}

/// Query params for the recommendation endpoints
#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub user_id: UserId,
    pub k: Option<i64>,
}

/// Response for the recommendation endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct RecsResponse {
    pub recs: RankedList,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct SnapshotInfo {
    pub version: u64,
    pub loaded_at: DateTime<Utc>,
    pub personal_users: usize,
    pub default_items: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub counters: BTreeMap<&'static str, u64>,
    pub snapshot: SnapshotInfo,
}

/// Query params for the reload endpoint; no `table` reloads both
#[derive(Debug, Deserialize)]
pub struct ReloadQuery {
    pub table: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub version: u64,
}

/// Build the router with all routes and middleware
pub fn router(state: Arc<AppState>, api: &ApiConfig) -> Router {
    let mut app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Recommendation endpoints
        .route("/recommendations_offline", post(recommendations_offline))
        .route("/recommendations_online", post(recommendations_online))
        .route("/recommendations", post(recommendations))
        // Observability and admin
        .route("/stats", get(stats))
        .route("/admin/reload", post(reload_snapshot))
        .layer(TimeoutLayer::new(api.request_timeout))
        .layer(TraceLayer::new_for_http());

    if api.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app.with_state(state)
}

/// Start the API server, returning once `shutdown` resolves and in-flight requests finish
pub async fn start_server<F>(state: Arc<AppState>, api: &ApiConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, api);

    let addr = format!("{}:{}", api.host, api.port);
    info!("🚀 Starting recommendation API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Offline recommendations of length k for user_id
async fn recommendations_offline(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<RecsResponse>> {
    let k = query.k.unwrap_or(state.default_k);
    let recs = state
        .service
        .offline(query.user_id, k)
        .await
        .map_err(|e| log_rejected(query.user_id, e))?;
    Ok(Json(RecsResponse { recs }))
}

/// Online recommendations of length k for user_id
async fn recommendations_online(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<RecsResponse>> {
    let k = query.k.unwrap_or(state.default_k);
    let recs = state
        .service
        .online(query.user_id, k)
        .await
        .map_err(|e| log_rejected(query.user_id, e))?;
    Ok(Json(RecsResponse { recs }))
}

/// Blended recommendations of length k for user_id
async fn recommendations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<RecsResponse>> {
    let k = query.k.unwrap_or(state.default_k);
    let recs = state
        .service
        .blended(query.user_id, k)
        .await
        .map_err(|e| log_rejected(query.user_id, e))?;
    Ok(Json(RecsResponse { recs }))
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let store = state.service.store();
    let table = store.snapshot();

    Json(StatsResponse {
        counters: store.stats().report(),
        snapshot: SnapshotInfo {
            version: table.version(),
            loaded_at: table.loaded_at(),
            personal_users: table.personal_users(),
            default_items: table.default_list().len(),
        },
    })
}

/// Reload the offline tables and swap the snapshot. The old snapshot stays on failure.
async fn reload_snapshot(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReloadQuery>,
) -> Result<Json<ReloadResponse>> {
    let kind = query
        .table
        .as_deref()
        .map(str::parse::<TableKind>)
        .transpose()
        .map_err(|e| {
            warn!("Reload rejected: {}", e);
            e
        })?;

    let config = state.snapshot_config.clone();
    let current = state.service.store().snapshot();

    let loaded = tokio::task::spawn_blocking(move || match kind {
        None => snapshot::load_snapshot(&config),
        Some(kind) => snapshot::load_table(kind, config.path_for(kind))
            .map(|table| current.with_loaded(table)),
    })
    .await
    .map_err(Error::internal)?;

    let table = loaded.map_err(|e| {
        error!("Snapshot reload failed: {}", e);
        e
    })?;

    let version = state.service.store().replace(table);
    info!(
        version,
        table = kind.map_or_else(|| "all".to_string(), |k| k.to_string()),
        "Snapshot reloaded"
    );
    Ok(Json(ReloadResponse { version }))
}

/// Log a failed recommendation request before it becomes a response
fn log_rejected(user: UserId, e: Error) -> Error {
    if e.is_client_error() {
        warn!(user, error = %e, "Recommendation request rejected");
    } else {
        error!(user, error = %e, "Recommendation request failed");
    }
    e
}
