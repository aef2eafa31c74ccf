//! Request counters for the offline lookup paths
//!
//! Counters live for the whole process and are logged once at shutdown.
//! Every increment is also forwarded to the `metrics` facade so a Prometheus
//! exporter (see the `metrics` feature) can scrape them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

pub const PERSONAL_COUNT_KEY: &str = "request_personal_count";
pub const DEFAULT_COUNT_KEY: &str = "request_default_count";

const OFFLINE_REQUESTS_METRIC: &str = "recommendations_offline_requests_total";

/// Monotonic counters of personal vs. default offline lookups
#[derive(Debug, Default)]
pub struct StatsCollector {
    personal: AtomicU64,
    default: AtomicU64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_personal_hit(&self) {
        self.personal.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(OFFLINE_REQUESTS_METRIC, "path" => "personal").increment(1);
    }

    pub fn record_default_hit(&self) {
        self.default.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(OFFLINE_REQUESTS_METRIC, "path" => "default").increment(1);
    }

    /// Snapshot of all counters. Not atomic across counters.
    pub fn report(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            (PERSONAL_COUNT_KEY, self.personal.load(Ordering::Relaxed)),
            (DEFAULT_COUNT_KEY, self.default.load(Ordering::Relaxed)),
        ])
    }

    /// Write every counter to the log.
    pub fn log_report(&self) {
        info!("Stats for recommendations");
        for (name, value) in self.report() {
            info!("{:<30} {}", name, value);
        }
    }
}
