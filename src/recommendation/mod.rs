//! Recommendation Module
//!
//! Blends two ranked sources into one list per user.
//!
//! ## Architecture
//!
//! 1. **Offline** - precomputed personal rankings with a default fallback, served from an immutable snapshot
//! 2. **Online** - recent events expanded into similar items, reranked by similarity score
//! 3. **Blender** - interleaves both rankings, drops duplicates, truncates to `k`
//!
//! `dedup` is shared by the online and blending stages; `stats` counts which
//! offline path served each request.

pub mod blender;
pub mod clients;
pub mod dedup;
pub mod offline;
pub mod online;
pub mod service;
pub mod snapshot;
pub mod stats;

use serde::{Deserialize, Serialize};

/// Opaque item identifier
pub type ItemId = i64;

/// Opaque user identifier
pub type UserId = i64;

/// Item ids, most relevant first
pub type RankedList = Vec<ItemId>;

/// A candidate with its similarity score. Scores are only comparable within one expansion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub score: f64,
}

pub use offline::OfflineStore;
pub use online::{EventSource, ExpansionSettings, OnlineExpander, SimilaritySource};
pub use service::RecommendationService;
pub use snapshot::{LoadedTable, RecommendationTable, TableKind};
pub use stats::StatsCollector;
