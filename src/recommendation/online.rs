//! Online expansion of a user's recent history
//!
//! Algorithm:
//! 1. Fetch the user's most recent events from the events store
//! 2. For each recent item, fetch up to `k` similar items with scores
//! 3. Flatten every (item, score) pair into one candidate list
//! 4. Stable sort by score descending, strip scores, dedup
//!
//! Similarity calls fan out on a `JoinSet` bounded by a semaphore. Each
//! outbound call carries its own timeout; a failed or timed-out call only
//! removes that source's candidates.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};

use super::dedup::dedup;
use super::{ItemId, RankedList, ScoredItem, UserId};
use crate::config::Config;
use crate::error::{Error, Result};

const ONLINE_REQUESTS_METRIC: &str = "recommendations_online_requests_total";
const SIMILARITY_FAILURES_METRIC: &str = "similarity_call_failures_total";

/// Source of a user's recent interactions, most recent first
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn recent_events(&self, user: UserId, count: usize) -> Result<Vec<ItemId>>;
}

/// Source of items similar to a given item
#[async_trait]
pub trait SimilaritySource: Send + Sync {
    async fn similar_items(&self, item: ItemId, count: usize) -> Result<Vec<ScoredItem>>;
}

/// Tuning for one expansion
#[derive(Debug, Clone)]
pub struct ExpansionSettings {
    /// How many recent events seed the expansion
    pub recent_event_count: usize,
    /// Similarity calls allowed in flight at once
    pub max_concurrency: usize,
    /// Timeout for every outbound call
    pub call_timeout: Duration,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            recent_event_count: 3,
            max_concurrency: 4,
            call_timeout: Duration::from_secs(2),
        }
    }
}

impl ExpansionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            recent_event_count: config.recommendation.recent_event_count,
            max_concurrency: config.collaborators.similarity_max_concurrency,
            call_timeout: config.collaborators.timeout,
        }
    }
}

#[derive(Clone)]
pub struct OnlineExpander {
    events: Arc<dyn EventSource>,
    similarity: Arc<dyn SimilaritySource>,
    settings: ExpansionSettings,
}

impl OnlineExpander {
    pub fn new(
        events: Arc<dyn EventSource>,
        similarity: Arc<dyn SimilaritySource>,
        settings: ExpansionSettings,
    ) -> Self {
        Self {
            events,
            similarity,
            settings,
        }
    }

    /// Expand using the configured number of recent events.
    pub async fn expand(&self, user: UserId, k: usize) -> RankedList {
        self.expand_with(user, k, self.settings.recent_event_count)
            .await
    }

    /// Never fails: collaborator problems shrink the result instead.
    #[instrument(skip(self))]
    pub async fn expand_with(
        &self,
        user: UserId,
        k: usize,
        recent_event_count: usize,
    ) -> RankedList {
        if k == 0 || recent_event_count == 0 {
            return Vec::new();
        }

        let events = match self.fetch_events(user, recent_event_count).await {
            Ok(events) => events,
            Err(e) => {
                warn!(user, error = %e, "Events store unavailable, no online candidates");
                metrics::counter!(ONLINE_REQUESTS_METRIC, "outcome" => "events_unavailable")
                    .increment(1);
                return Vec::new();
            }
        };

        let recent: Vec<ItemId> = events.into_iter().take(recent_event_count).collect();
        if recent.is_empty() {
            debug!(user, "No recent events");
            metrics::counter!(ONLINE_REQUESTS_METRIC, "outcome" => "no_history").increment(1);
            return Vec::new();
        }

        let candidates: Vec<ScoredItem> = self
            .fetch_similar(&recent, k)
            .await
            .into_iter()
            .flatten()
            .collect();

        let recs = rank_candidates(candidates);
        debug!(
            user,
            recent_events = recent.len(),
            recommendations = recs.len(),
            "Online expansion finished"
        );
        metrics::counter!(ONLINE_REQUESTS_METRIC, "outcome" => "expanded").increment(1);
        recs
    }

    async fn fetch_events(&self, user: UserId, count: usize) -> Result<Vec<ItemId>> {
        let timeout = self.settings.call_timeout;
        tokio::time::timeout(timeout, self.events.recent_events(user, count))
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            })?
    }

    /// One batch per recent item, in the order of `items`. Failed sources yield an empty batch.
    async fn fetch_similar(&self, items: &[ItemId], k: usize) -> Vec<Vec<ScoredItem>> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let timeout = self.settings.call_timeout;
        let mut set = JoinSet::new();

        for (index, &item) in items.iter().enumerate() {
            let similarity = self.similarity.clone();
            let semaphore = semaphore.clone();

            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;

                let result = match tokio::time::timeout(timeout, similarity.similar_items(item, k))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                };

                (index, item, result)
            });
        }

        let mut batches = vec![Vec::new(); items.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, _, Ok(mut similar))) => {
                    similar.truncate(k);
                    batches[index] = similar;
                }
                Ok((_, item, Err(e))) => {
                    warn!(item, error = %e, "Similar items lookup failed, skipping source");
                    metrics::counter!(SIMILARITY_FAILURES_METRIC).increment(1);
                }
                Err(e) => {
                    error!("Similarity task join error: {}", e);
                    metrics::counter!(SIMILARITY_FAILURES_METRIC).increment(1);
                }
            }
        }

        batches
    }
}

/// Score-descending ranking with ties kept in input order. NaN scores are dropped.
pub fn rank_candidates(mut candidates: Vec<ScoredItem>) -> RankedList {
    candidates.retain(|c| !c.score.is_nan());
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    dedup(candidates.into_iter().map(|c| c.item_id))
}
