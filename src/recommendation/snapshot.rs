//! Offline recommendation snapshot
//!
//! A [`RecommendationTable`] is built once from two JSON Lines files and never
//! mutated afterwards. Reloading builds a fresh table which the
//! [`OfflineStore`](super::offline::OfflineStore) swaps in whole.
//!
//! File layout, one JSON object per line:
//!
//! ```text
//! personal: {"user_id": 1291248, "item_id": 17245, "rank": 1}
//! default:  {"item_id": 17245, "rank": 1}
//! ```
//!
//! Rows are ordered by `rank` ascending; equal ranks keep file order.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use super::dedup::dedup;
use super::{ItemId, RankedList, UserId};
use crate::config::SnapshotConfig;
use crate::error::{Error, Result};

/// Immutable personal + default rankings
#[derive(Debug, Clone)]
pub struct RecommendationTable {
    personal: Option<HashMap<UserId, RankedList>>,
    default: RankedList,
    version: u64,
    loaded_at: DateTime<Utc>,
}

impl RecommendationTable {
    /// Repeated items are dropped from every list, first occurrence wins.
    pub fn new(personal: HashMap<UserId, RankedList>, default: RankedList) -> Self {
        let personal = personal
            .into_iter()
            .map(|(user, ranked)| (user, dedup(ranked)))
            .collect();

        Self {
            personal: Some(personal),
            default: dedup(default),
            version: 0,
            loaded_at: Utc::now(),
        }
    }

    /// A table with only the default list (no personal rows were loaded).
    pub fn default_only(default: RankedList) -> Self {
        Self {
            personal: None,
            default: dedup(default),
            version: 0,
            loaded_at: Utc::now(),
        }
    }

    /// Copy of this table with one side replaced by a freshly loaded table.
    pub fn with_loaded(&self, loaded: LoadedTable) -> Self {
        match loaded {
            LoadedTable::Personal(personal) => Self::new(personal, self.default.clone()),
            LoadedTable::Default(default) => Self {
                personal: self.personal.clone(),
                default: dedup(default),
                version: 0,
                loaded_at: Utc::now(),
            },
        }
    }

    pub fn empty() -> Self {
        Self::default_only(Vec::new())
    }

    /// Personal ranking for `user`.
    ///
    /// `NotFound` when the user has no row; `Snapshot` when the personal table
    /// itself is missing.
    pub fn personal(&self, user: UserId) -> Result<&[ItemId]> {
        let table = self
            .personal
            .as_ref()
            .ok_or_else(|| Error::snapshot("personal", "personal table not loaded"))?;

        table
            .get(&user)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::not_found("user", user.to_string()))
    }

    pub fn default_list(&self) -> &[ItemId] {
        &self.default
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn personal_users(&self) -> usize {
        self.personal.as_ref().map_or(0, HashMap::len)
    }

    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

/// Which offline table a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Personal,
    Default,
}

impl FromStr for TableKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "personal" => Ok(TableKind::Personal),
            "default" => Ok(TableKind::Default),
            other => Err(Error::invalid_argument(format!(
                "unknown table kind '{}', expected 'personal' or 'default'",
                other
            ))),
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Personal => f.write_str("personal"),
            TableKind::Default => f.write_str("default"),
        }
    }
}

/// Result of loading a single table file
#[derive(Debug)]
pub enum LoadedTable {
    Personal(HashMap<UserId, RankedList>),
    Default(RankedList),
}

#[derive(Debug, Deserialize)]
struct PersonalRow {
    user_id: UserId,
    item_id: ItemId,
    rank: i64,
}

#[derive(Debug, Deserialize)]
struct DefaultRow {
    item_id: ItemId,
    rank: i64,
}

/// Load one table of the given kind from a JSON Lines file.
pub fn load_table(kind: TableKind, source: &Path) -> Result<LoadedTable> {
    info!("Loading recommendations, type: {}", kind);
    let table = match kind {
        TableKind::Personal => LoadedTable::Personal(load_personal(source)?),
        TableKind::Default => LoadedTable::Default(load_default(source)?),
    };
    info!("Loaded {} recommendations from {}", kind, source.display());
    Ok(table)
}

/// Load both tables named by the configuration into a fresh snapshot.
pub fn load_snapshot(config: &SnapshotConfig) -> Result<RecommendationTable> {
    let mut personal = None;
    let mut default = None;

    for kind in [TableKind::Personal, TableKind::Default] {
        match load_table(kind, config.path_for(kind))? {
            LoadedTable::Personal(table) => personal = Some(table),
            LoadedTable::Default(list) => default = Some(list),
        }
    }

    let personal = personal.unwrap_or_default();
    let default = default.unwrap_or_default();

    info!(
        users = personal.len(),
        default_items = default.len(),
        "Snapshot assembled"
    );

    Ok(RecommendationTable::new(personal, default))
}

fn load_personal(path: &Path) -> Result<HashMap<UserId, RankedList>> {
    let rows: Vec<PersonalRow> = read_rows(path)?;

    let mut grouped: HashMap<UserId, Vec<(i64, ItemId)>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.user_id)
            .or_default()
            .push((row.rank, row.item_id));
    }

    Ok(grouped
        .into_iter()
        .map(|(user, ranked)| (user, finalize(ranked)))
        .collect())
}

fn load_default(path: &Path) -> Result<RankedList> {
    let rows: Vec<DefaultRow> = read_rows(path)?;
    Ok(finalize(
        rows.into_iter().map(|row| (row.rank, row.item_id)).collect(),
    ))
}

/// Order by rank (stable) and drop repeated items.
fn finalize(mut ranked: Vec<(i64, ItemId)>) -> RankedList {
    ranked.sort_by_key(|(rank, _)| *rank);
    dedup(ranked.into_iter().map(|(_, item)| item))
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|e| Error::snapshot(display.clone(), e.to_string()))?;

    let mut rows = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::snapshot(display.clone(), e.to_string()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let row = serde_json::from_str(line).map_err(|e| {
            Error::snapshot(display.clone(), format!("line {}: {}", index + 1, e))
        })?;
        rows.push(row);
    }

    Ok(rows)
}
