//! Configuration management for the RecBlend engine
//!
//! Provides strongly-typed configuration with validation, environment variable parsing,
//! and sensible defaults.
//!
//! # Example
//! ```no_run
//! use recblend::Config;
//! let config = Config::from_env().expect("failed to load config");
//! println!("Events store: {}", config.collaborators.events_url);
//! ```

use crate::error::{Error, Result};
use crate::recommendation::TableKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,
    /// Offline snapshot locations
    pub snapshot: SnapshotConfig,
    /// Events and features store endpoints
    pub collaborators: CollaboratorConfig,
    /// Recommendation defaults
    pub recommendation: RecommendationConfig,
    /// Prometheus exporter port (only used with the `metrics` feature)
    pub metrics_port: u16,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port to listen on
    pub port: u16,
    /// Host to bind to
    pub host: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Enable CORS
    pub cors_enabled: bool,
}

/// Where the offline recommendation tables live
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Personal recommendations, rows of `user_id`, `item_id`, `rank`
    pub personal_path: PathBuf,
    /// Default (top) recommendations, rows of `item_id`, `rank`
    pub default_path: PathBuf,
}

/// External collaborator configuration
#[derive(Debug, Clone)]
pub struct CollaboratorConfig {
    /// Events store base URL
    pub events_url: String,
    /// Features (similar items) store base URL
    pub features_url: String,
    /// Timeout applied to every outbound call
    pub timeout: Duration,
    /// Maximum similarity calls in flight for one request
    pub similarity_max_concurrency: usize,
}

/// Recommendation defaults
#[derive(Debug, Clone)]
pub struct RecommendationConfig {
    /// How many recent events seed the online expansion
    pub recent_event_count: usize,
    /// List size used when a request omits `k`
    pub default_k: i64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            events_url: "http://127.0.0.1:8020".to_string(),
            features_url: "http://127.0.0.1:8010".to_string(),
            timeout: Duration::from_millis(2000),
            similarity_max_concurrency: 4,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            recent_event_count: 3,
            default_k: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Try to load .env file (ignore if not found)
        dotenvy::dotenv().ok();

        let config = Self {
            api: ApiConfig::from_env()?,
            snapshot: SnapshotConfig::from_env()?,
            collaborators: CollaboratorConfig::from_env()?,
            recommendation: RecommendationConfig::from_env()?,
            metrics_port: get_env_parsed_or("METRICS_PORT", 9000)?,
        };

        config.validate()?;
        config.log_summary();

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (key, url) in [
            ("EVENTS_STORE_URL", &self.collaborators.events_url),
            ("FEATURES_STORE_URL", &self.collaborators.features_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidConfig {
                    key,
                    message: format!("Expected an http(s) URL, got '{}'", url).into(),
                });
            }
        }

        if self.collaborators.timeout.is_zero() {
            return Err(Error::InvalidConfig {
                key: "COLLABORATOR_TIMEOUT_MS",
                message: "timeout must be positive".into(),
            });
        }

        if self.collaborators.similarity_max_concurrency == 0 {
            return Err(Error::InvalidConfig {
                key: "SIMILARITY_MAX_CONCURRENCY",
                message: "concurrency must be at least 1".into(),
            });
        }

        if self.recommendation.recent_event_count == 0 {
            return Err(Error::InvalidConfig {
                key: "RECENT_EVENT_COUNT",
                message: "recent event count must be at least 1".into(),
            });
        }

        if self.recommendation.default_k <= 0 {
            return Err(Error::InvalidConfig {
                key: "REC_DEFAULT_K",
                message: "default k must be positive".into(),
            });
        }

        for (key, path) in [
            ("PERSONAL_RECS_PATH", &self.snapshot.personal_path),
            ("DEFAULT_RECS_PATH", &self.snapshot.default_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(Error::InvalidConfig {
                    key,
                    message: "path cannot be empty".into(),
                });
            }
        }

        Ok(())
    }

    /// Log configuration summary
    fn log_summary(&self) {
        info!("Configuration loaded:");
        info!("  API:");
        info!("    Listening on: {}:{}", self.api.host, self.api.port);
        info!("  Snapshot:");
        info!("    Personal: {}", self.snapshot.personal_path.display());
        info!("    Default: {}", self.snapshot.default_path.display());
        info!("  Collaborators:");
        info!("    Events store: {}", self.collaborators.events_url);
        info!("    Features store: {}", self.collaborators.features_url);
        info!("    Timeout: {:?}", self.collaborators.timeout);
        info!(
            "    Similarity fan-out: {}",
            self.collaborators.similarity_max_concurrency
        );
        info!("  Recommendations:");
        info!(
            "    Recent events: {}, default k: {}",
            self.recommendation.recent_event_count, self.recommendation.default_k
        );
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            port: get_env_parsed_or("API_PORT", 8000)?,
            host: get_env_or("API_HOST", "0.0.0.0"),
            request_timeout: Duration::from_secs(get_env_parsed_or("API_REQUEST_TIMEOUT_SECS", 30)?),
            cors_enabled: get_env_parsed_or("API_CORS_ENABLED", true)?,
        })
    }
}

impl SnapshotConfig {
    /// File holding the table of the given kind
    pub fn path_for(&self, kind: TableKind) -> &Path {
        match kind {
            TableKind::Personal => &self.personal_path,
            TableKind::Default => &self.default_path,
        }
    }

    fn from_env() -> Result<Self> {
        Ok(Self {
            personal_path: get_env_or("PERSONAL_RECS_PATH", "final_recommendations_feat.jsonl")
                .into(),
            default_path: get_env_or("DEFAULT_RECS_PATH", "top_recs.jsonl").into(),
        })
    }
}

impl CollaboratorConfig {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            events_url: trim_url(get_env_or("EVENTS_STORE_URL", &defaults.events_url)),
            features_url: trim_url(get_env_or("FEATURES_STORE_URL", &defaults.features_url)),
            timeout: Duration::from_millis(get_env_parsed_or("COLLABORATOR_TIMEOUT_MS", 2000)?),
            similarity_max_concurrency: get_env_parsed_or("SIMILARITY_MAX_CONCURRENCY", 4)?,
        })
    }
}

impl RecommendationConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            recent_event_count: get_env_parsed_or("RECENT_EVENT_COUNT", 3)?,
            default_k: get_env_parsed_or("REC_DEFAULT_K", 100)?,
        })
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Get environment variable with default
fn get_env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get and parse an optional environment variable; a present but malformed value is an error
fn get_env_parsed_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| Error::InvalidConfig {
            key,
            message: format!("Invalid value '{}': {}", value, e).into(),
        }),
        Err(_) => Ok(default),
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            api: ApiConfig {
                port: 8000,
                host: "127.0.0.1".to_string(),
                request_timeout: Duration::from_secs(30),
                cors_enabled: true,
            },
            snapshot: SnapshotConfig {
                personal_path: "personal.jsonl".into(),
                default_path: "default.jsonl".into(),
            },
            collaborators: CollaboratorConfig::default(),
            recommendation: RecommendationConfig::default(),
            metrics_port: 9000,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut config = valid_config();
        config.collaborators.features_url = "127.0.0.1:8010".to_string();
        match config.validate() {
            Err(Error::InvalidConfig { key, .. }) => assert_eq!(key, "FEATURES_STORE_URL"),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_zero_concurrency_and_k() {
        let mut config = valid_config();
        config.collaborators.similarity_max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.recommendation.default_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_api_values_are_rejected() {
        std::env::set_var("API_CORS_ENABLED", "sometimes");
        let result = ApiConfig::from_env();
        std::env::remove_var("API_CORS_ENABLED");

        match result {
            Err(Error::InvalidConfig { key, .. }) => assert_eq!(key, "API_CORS_ENABLED"),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_trim_url() {
        assert_eq!(trim_url("http://events:8020/".to_string()), "http://events:8020");
    }
}
