use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use recblend::api::{router, AppState};
use recblend::config::{ApiConfig, SnapshotConfig};
use recblend::{
    EventSource, ExpansionSettings, ItemId, OfflineStore, OnlineExpander, RecommendationService,
    RecommendationTable, Result, ScoredItem, SimilaritySource, UserId,
};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tower::ServiceExt;

struct History(HashMap<UserId, Vec<ItemId>>);

#[async_trait]
impl EventSource for History {
    async fn recent_events(&self, user: UserId, count: usize) -> Result<Vec<ItemId>> {
        Ok(self
            .0
            .get(&user)
            .map(|items| items.iter().take(count).copied().collect())
            .unwrap_or_default())
    }
}

struct Similar(HashMap<ItemId, Vec<ScoredItem>>);

#[async_trait]
impl SimilaritySource for Similar {
    async fn similar_items(&self, item: ItemId, _count: usize) -> Result<Vec<ScoredItem>> {
        Ok(self.0.get(&item).cloned().unwrap_or_default())
    }
}

fn api_config() -> ApiConfig {
    ApiConfig {
        port: 0,
        host: "127.0.0.1".to_string(),
        request_timeout: Duration::from_secs(5),
        cors_enabled: true,
    }
}

fn app_with_snapshot(snapshot_config: SnapshotConfig) -> Router {
    let table = RecommendationTable::new(HashMap::from([(1, vec![1, 2])]), vec![7, 8, 9]);
    let store = Arc::new(OfflineStore::new(table));

    let expander = OnlineExpander::new(
        Arc::new(History(HashMap::from([(1, vec![500])]))),
        Arc::new(Similar(HashMap::from([(
            500,
            vec![
                ScoredItem { item_id: 1, score: 0.9 },
                ScoredItem { item_id: 3, score: 0.8 },
                ScoredItem { item_id: 4, score: 0.7 },
            ],
        )]))),
        ExpansionSettings::default(),
    );

    let state = Arc::new(AppState {
        service: RecommendationService::new(store, expander),
        snapshot_config,
        default_k: 100,
    });

    router(state, &api_config())
}

fn app() -> Router {
    app_with_snapshot(SnapshotConfig {
        personal_path: PathBuf::from("/nonexistent/personal.jsonl"),
        default_path: PathBuf::from("/nonexistent/default.jsonl"),
    })
}

async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn recs(body: &Value) -> Vec<i64> {
    body["recs"]
        .as_array()
        .expect("recs array")
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn health_reports_healthy() {
    let (status, body) = call(app(), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn offline_endpoint_serves_personal_and_default() {
    let (status, body) = call(app(), "POST", "/recommendations_offline?user_id=1&k=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recs(&body), vec![1]);

    let (_, body) = call(app(), "POST", "/recommendations_offline?user_id=42").await;
    assert_eq!(recs(&body), vec![7, 8, 9]);
}

#[tokio::test]
async fn online_endpoint_expands_history() {
    let (status, body) = call(app(), "POST", "/recommendations_online?user_id=1&k=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recs(&body), vec![1, 3, 4]);

    let (_, body) = call(app(), "POST", "/recommendations_online?user_id=2&k=10").await;
    assert!(recs(&body).is_empty());
}

#[tokio::test]
async fn blended_endpoint_interleaves() {
    let (status, body) = call(app(), "POST", "/recommendations?user_id=1&k=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recs(&body), vec![1, 2, 3]);
}

#[tokio::test]
async fn non_positive_k_is_rejected() {
    let (status, body) = call(app(), "POST", "/recommendations?user_id=1&k=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

    let (status, _) = call(app(), "POST", "/recommendations_offline?user_id=1&k=-5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_user_id_is_rejected() {
    let (status, _) = call(app(), "POST", "/recommendations?k=3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_counts_offline_paths() {
    let app = app();
    call(app.clone(), "POST", "/recommendations_offline?user_id=1").await;
    call(app.clone(), "POST", "/recommendations_offline?user_id=2").await;
    call(app.clone(), "POST", "/recommendations?user_id=3&k=2").await;

    let (status, body) = call(app, "GET", "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counters"]["request_personal_count"], 1);
    assert_eq!(body["counters"]["request_default_count"], 2);
    assert_eq!(body["snapshot"]["version"], 1);
    assert_eq!(body["snapshot"]["default_items"], 3);
}

#[tokio::test]
async fn reload_swaps_snapshot() {
    let mut personal = NamedTempFile::new().unwrap();
    writeln!(personal, r#"{{"user_id": 1, "item_id": 55, "rank": 1}}"#).unwrap();
    let mut default = NamedTempFile::new().unwrap();
    writeln!(default, r#"{{"item_id": 66, "rank": 1}}"#).unwrap();

    let app = app_with_snapshot(SnapshotConfig {
        personal_path: personal.path().to_path_buf(),
        default_path: default.path().to_path_buf(),
    });

    let (status, body) = call(app.clone(), "POST", "/admin/reload").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);

    let (_, body) = call(app.clone(), "POST", "/recommendations_offline?user_id=1").await;
    assert_eq!(recs(&body), vec![55]);
    let (_, body) = call(app, "POST", "/recommendations_offline?user_id=9").await;
    assert_eq!(recs(&body), vec![66]);
}

#[tokio::test]
async fn failed_reload_keeps_old_snapshot() {
    let app = app();

    let (status, body) = call(app.clone(), "POST", "/admin/reload").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "SNAPSHOT_ERROR");

    let (_, body) = call(app, "POST", "/recommendations_offline?user_id=1").await;
    assert_eq!(recs(&body), vec![1, 2]);
}

#[tokio::test]
async fn reload_single_table_keeps_the_other() {
    let mut default = NamedTempFile::new().unwrap();
    writeln!(default, r#"{{"item_id": 66, "rank": 1}}"#).unwrap();
    writeln!(default, r#"{{"item_id": 66, "rank": 2}}"#).unwrap();

    let app = app_with_snapshot(SnapshotConfig {
        personal_path: PathBuf::from("/nonexistent/personal.jsonl"),
        default_path: default.path().to_path_buf(),
    });

    let (status, body) = call(app.clone(), "POST", "/admin/reload?table=default").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);

    let (_, body) = call(app.clone(), "POST", "/recommendations_offline?user_id=1").await;
    assert_eq!(recs(&body), vec![1, 2]);
    let (_, body) = call(app, "POST", "/recommendations_offline?user_id=9").await;
    assert_eq!(recs(&body), vec![66]);
}

#[tokio::test]
async fn reload_unknown_table_is_rejected() {
    let app = app();

    let (status, body) = call(app.clone(), "POST", "/admin/reload?table=similar").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

    let (_, body) = call(app, "GET", "/stats").await;
    assert_eq!(body["snapshot"]["version"], 1);
}
