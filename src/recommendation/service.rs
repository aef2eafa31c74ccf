//! Offline, online and blended recommendations behind one handle.

use std::sync::Arc;
use tracing::debug;

use super::blender;
use super::offline::OfflineStore;
use super::online::OnlineExpander;
use super::{RankedList, UserId};
use crate::error::{Error, Result};

const BLENDED_REQUESTS_METRIC: &str = "recommendations_blended_requests_total";

#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<OfflineStore>,
    expander: OnlineExpander,
}

impl RecommendationService {
    pub fn new(store: Arc<OfflineStore>, expander: OnlineExpander) -> Self {
        Self { store, expander }
    }

    pub fn store(&self) -> &Arc<OfflineStore> {
        &self.store
    }

    /// Precomputed recommendations for `user`.
    pub async fn offline(&self, user: UserId, k: i64) -> Result<RankedList> {
        let k = validate_k(k)?;
        Ok(self.store.lookup(user, k))
    }

    /// Recommendations expanded from the user's recent history.
    pub async fn online(&self, user: UserId, k: i64) -> Result<RankedList> {
        let k = validate_k(k)?;
        Ok(self.expander.expand(user, k).await)
    }

    /// Offline and online rankings interleaved into one list of at most `k` items.
    pub async fn blended(&self, user: UserId, k: i64) -> Result<RankedList> {
        let k = validate_k(k)?;

        let (offline, online) = tokio::join!(
            async { self.store.lookup(user, k) },
            self.expander.expand(user, k)
        );

        let blended = blender::merge(&offline, &online, k);
        debug!(
            user,
            k,
            offline = offline.len(),
            online = online.len(),
            blended = blended.len(),
            "Blended recommendations"
        );
        metrics::counter!(BLENDED_REQUESTS_METRIC).increment(1);

        Ok(blended)
    }
}

/// Requested list sizes must be positive.
pub fn validate_k(k: i64) -> Result<usize> {
    if k <= 0 {
        return Err(Error::invalid_argument(format!(
            "k must be positive, got {}",
            k
        )));
    }
    usize::try_from(k).map_err(|_| Error::invalid_argument(format!("k too large: {}", k)))
}
