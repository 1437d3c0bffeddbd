//! Runtime configuration.
//!
//! Defaults work out of the box. Each knob can be overridden through a
//! `REGCHECK_*` environment variable; malformed overrides are logged and
//! ignored rather than treated as fatal.

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::warn;
use url::Url;

/// Upstream host report pages are fetched from.
pub const DEFAULT_BASE_URL: &str = "https://www.checkcardetails.co.uk";

/// How long a stored record keeps being served without a refetch.
const DEFAULT_FRESHNESS_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the report host, no trailing slash.
    pub base_url: String,
    /// Age under which a stored record is served from the store.
    pub freshness_window: Duration,
    /// Optional whole-request timeout. `None` leaves requests to the
    /// transport's own limits.
    pub request_timeout: Option<StdDuration>,
    /// SQLite database location.
    pub store_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            freshness_window: Duration::days(DEFAULT_FRESHNESS_DAYS),
            request_timeout: None,
            store_path: default_store_path(),
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied: `REGCHECK_SOURCE_URL`,
    /// `REGCHECK_FRESH_DAYS`, `REGCHECK_HTTP_TIMEOUT_MS`, `REGCHECK_DB_PATH`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("REGCHECK_SOURCE_URL") {
            match Url::parse(&raw) {
                Ok(_) => config.base_url = raw.trim_end_matches('/').to_string(),
                Err(e) => warn!("ignoring invalid REGCHECK_SOURCE_URL: {e}"),
            }
        }
        if let Ok(raw) = std::env::var("REGCHECK_FRESH_DAYS") {
            match raw.parse::<i64>() {
                Ok(days) if (0..=3650).contains(&days) => {
                    config.freshness_window = Duration::days(days);
                }
                _ => warn!("ignoring invalid REGCHECK_FRESH_DAYS: {raw}"),
            }
        }
        if let Ok(raw) = std::env::var("REGCHECK_HTTP_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => config.request_timeout = Some(StdDuration::from_millis(ms)),
                _ => warn!("ignoring invalid REGCHECK_HTTP_TIMEOUT_MS: {raw}"),
            }
        }
        if let Ok(raw) = std::env::var("REGCHECK_DB_PATH") {
            if !raw.is_empty() {
                config.store_path = PathBuf::from(raw);
            }
        }
        config
    }
}

fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".regcheck")
        .join("vehicles.db")
}
