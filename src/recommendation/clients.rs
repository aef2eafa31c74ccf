//! HTTP clients for the events store and the features store
//!
//! Wire contract:
//! - events:   `POST {base}/get?user_id=..&k=..` -> `{"events": [item_id, ...]}`
//! - features: `POST {base}/similar_items?item_id=..&k=..`
//!   -> `{"item_id_2": [item_id, ...], "score": [f64, ...]}`

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::online::{EventSource, SimilaritySource};
use super::{ItemId, ScoredItem, UserId};
use crate::error::{Error, Result};

const EVENTS_SERVICE: &str = "events";
const FEATURES_SERVICE: &str = "features";

/// Shared reqwest client with the collaborator timeout applied to every request.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config {
            message: "Failed to build HTTP client".into(),
            source: Some(Box::new(e)),
        })
}

#[derive(Debug, Serialize)]
struct EventsQuery {
    user_id: UserId,
    k: usize,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<ItemId>,
}

#[derive(Debug, Serialize)]
struct SimilarItemsQuery {
    item_id: ItemId,
    k: usize,
}

#[derive(Debug, Deserialize)]
struct SimilarItemsResponse {
    #[serde(default)]
    item_id_2: Vec<ItemId>,
    #[serde(default)]
    score: Vec<f64>,
}

/// Events store client
#[derive(Clone)]
pub struct EventsClient {
    client: Client,
    base_url: String,
}

impl EventsClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl EventSource for EventsClient {
    #[instrument(skip(self))]
    async fn recent_events(&self, user: UserId, count: usize) -> Result<Vec<ItemId>> {
        let url = format!("{}/get", self.base_url);
        let body: EventsResponse = post_json(
            &self.client,
            &url,
            &EventsQuery {
                user_id: user,
                k: count,
            },
            EVENTS_SERVICE,
        )
        .await?;

        debug!(user, events = body.events.len(), "Fetched recent events");
        Ok(body.events)
    }
}

/// Features store client
#[derive(Clone)]
pub struct FeaturesClient {
    client: Client,
    base_url: String,
}

impl FeaturesClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SimilaritySource for FeaturesClient {
    #[instrument(skip(self))]
    async fn similar_items(&self, item: ItemId, count: usize) -> Result<Vec<ScoredItem>> {
        let url = format!("{}/similar_items", self.base_url);
        let body: SimilarItemsResponse = post_json(
            &self.client,
            &url,
            &SimilarItemsQuery { item_id: item, k: count },
            FEATURES_SERVICE,
        )
        .await?;

        if body.item_id_2.len() != body.score.len() {
            warn!(
                item,
                items = body.item_id_2.len(),
                scores = body.score.len(),
                "Similar items and scores differ in length, extra entries dropped"
            );
        }

        Ok(body
            .item_id_2
            .into_iter()
            .zip(body.score)
            .take(count)
            .map(|(item_id, score)| ScoredItem { item_id, score })
            .collect())
    }
}

async fn post_json<Q, T>(client: &Client, url: &str, query: &Q, service: &'static str) -> Result<T>
where
    Q: Serialize + ?Sized,
    T: serde::de::DeserializeOwned,
{
    let unavailable = move |e: reqwest::Error| Error::collaborator(service, e.to_string());

    client
        .post(url)
        .header(ACCEPT, "application/json")
        .query(query)
        .send()
        .await
        .map_err(unavailable)?
        .error_for_status()
        .map_err(unavailable)?
        .json::<T>()
        .await
        .map_err(unavailable)
}
