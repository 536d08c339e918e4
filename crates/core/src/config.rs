//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ConfigError, ConfigResult};

/// TTL applied when a feed configures zero or a negative value
pub const DEFAULT_TTL_SECONDS: i64 = 30;

/// Largest accepted TTL, one year
pub const MAX_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Capacity of each worker's handoff queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 2;

/// Free-form extractor settings. Their meaning depends on the extractor kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorOptions {
    #[serde(default, alias = "Opt1")]
    pub opt1: String,
    #[serde(default, alias = "Opt2")]
    pub opt2: String,
    #[serde(default, alias = "Opt3")]
    pub opt3: String,
}

/// One configured price feed
///
/// Field aliases accept settings files written with the legacy key names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    #[serde(alias = "Title")]
    pub title: String,
    #[serde(default, alias = "Url")]
    pub url: String,
    #[serde(default = "default_extractor", alias = "ScrapperClass", alias = "scrapperclass")]
    pub extractor: String,
    #[serde(default, alias = "ScraperOptions", alias = "scraperoptions")]
    pub options: ExtractorOptions,
    #[serde(default, alias = "Expires", alias = "expires")]
    pub ttl_seconds: i64,
}

fn default_extractor() -> String {
    "json".to_string()
}

impl FeedDescriptor {
    /// TTL with non-positive values replaced by the default
    pub fn effective_ttl_seconds(&self) -> i64 {
        normalize_ttl(self.ttl_seconds)
    }

    /// Reject a TTL above `MAX_TTL_SECONDS`
    pub fn validate_ttl(&self) -> ConfigResult<()> {
        if self.ttl_seconds > MAX_TTL_SECONDS {
            return Err(ConfigError::TtlOutOfRange {
                ttl_seconds: self.ttl_seconds,
                max_seconds: MAX_TTL_SECONDS,
            });
        }
        Ok(())
    }
}

/// Non-positive TTLs become the default, oversized ones are capped at the maximum
pub fn normalize_ttl(ttl_seconds: i64) -> i64 {
    if ttl_seconds < 1 {
        DEFAULT_TTL_SECONDS
    } else {
        ttl_seconds.min(MAX_TTL_SECONDS)
    }
}

/// Settings for one pool of workers
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub title: String,
    pub poll_interval: Duration,
    pub queue_capacity: usize,
}

impl PoolConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            poll_interval: Duration::from_secs(1),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default, alias = "BitcoinFeeds", alias = "bitcoinfeeds")]
    pub bitcoin_feeds: Vec<FeedDescriptor>,
    #[serde(default, alias = "EuroFeeds", alias = "eurofeeds")]
    pub euro_feeds: Vec<FeedDescriptor>,
    #[serde(default, alias = "MinBitcoin", alias = "minbitcoin")]
    pub min_bitcoin: usize,
    #[serde(default, alias = "MinEuro", alias = "mineuro")]
    pub min_euro: usize,
    /// "stdout", a file path, or empty to disable logging
    #[serde(default, alias = "LogFile", alias = "logfile")]
    pub log_file: String,
    #[serde(default = "default_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub status_interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    1000
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms.max(1))
    }

    pub fn pool_config(&self, title: &str) -> PoolConfig {
        PoolConfig {
            title: title.to_string(),
            poll_interval: self.poll_interval(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bitcoin_feeds: vec![],
            euro_feeds: vec![],
            min_bitcoin: 0,
            min_euro: 0,
            log_file: String::new(),
            poll_interval_ms: default_interval_ms(),
            status_interval_ms: default_interval_ms(),
        }
    }
}
