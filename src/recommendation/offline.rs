//! Offline recommendation store
//!
//! Serves precomputed rankings from the current [`RecommendationTable`]
//! snapshot. Lookups load the snapshot pointer without locking; a reload
//! stores a new `Arc` so readers never observe a half-built table.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::snapshot::RecommendationTable;
use super::stats::StatsCollector;
use super::{ItemId, RankedList, UserId};
use crate::error::Error;

pub struct OfflineStore {
    table: ArcSwap<RecommendationTable>,
    next_version: AtomicU64,
    stats: StatsCollector,
}

impl OfflineStore {
    pub fn new(table: RecommendationTable) -> Self {
        Self {
            table: ArcSwap::from_pointee(table.with_version(1)),
            next_version: AtomicU64::new(2),
            stats: StatsCollector::new(),
        }
    }

    /// Top `k` items for `user`, falling back to the default list.
    pub fn lookup(&self, user: UserId, k: usize) -> RankedList {
        let table = self.table.load();

        match table.personal(user) {
            Ok(items) => {
                self.stats.record_personal_hit();
                debug!(user, k, available = items.len(), "Personal recommendations hit");
                take_k(items, k)
            }
            Err(Error::NotFound { .. }) => {
                self.stats.record_default_hit();
                debug!(user, k, "No personal recommendations, using default");
                take_k(table.default_list(), k)
            }
            Err(e) => {
                warn!(user, error = %e, "Personal lookup failed, using default");
                self.stats.record_default_hit();
                take_k(table.default_list(), k)
            }
        }
    }

    /// The snapshot currently being served.
    pub fn snapshot(&self) -> Arc<RecommendationTable> {
        self.table.load_full()
    }

    /// Swap in a freshly loaded table, returning its version.
    pub fn replace(&self, table: RecommendationTable) -> u64 {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        let users = table.personal_users();
        let default_items = table.default_list().len();

        self.table.store(Arc::new(table.with_version(version)));
        info!(version, users, default_items, "Offline snapshot replaced");
        version
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }
}

fn take_k(items: &[ItemId], k: usize) -> RankedList {
    items.iter().take(k).copied().collect()
}
