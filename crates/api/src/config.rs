//! Application configuration loaded from environment variables.

use std::time::Duration;

use saga::booking_creation::{MAX_STALE_AFTER, MIN_JANITOR_INTERVAL};
use saga::{JanitorConfig, RetryPolicy};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `INVENTORY_URL`: hotel service base URL (default: `"http://localhost:8081/api"`)
/// - `INVENTORY_TIMEOUT_MS`: per-request timeout (default: `5000`)
/// - `INVENTORY_MAX_ATTEMPTS`: confirm-availability attempts (default: `3`)
/// - `INVENTORY_RETRY_DELAY_MS`: pause between attempts (default: `1000`)
/// - `JANITOR_INTERVAL_SECS`: sweep period, at least 1 (default: `300`)
/// - `JANITOR_STALE_AFTER_SECS`: PENDING age that counts as orphaned, capped
///   at ten years (default: `3600`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub inventory_url: String,
    pub inventory_timeout: Duration,
    pub inventory_max_attempts: u32,
    pub inventory_retry_delay: Duration,
    pub janitor_interval: Duration,
    pub janitor_stale_after: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            inventory_url: lookup("INVENTORY_URL").unwrap_or(defaults.inventory_url),
            inventory_timeout: parsed("INVENTORY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.inventory_timeout),
            inventory_max_attempts: lookup("INVENTORY_MAX_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.inventory_max_attempts),
            inventory_retry_delay: parsed("INVENTORY_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.inventory_retry_delay),
            janitor_interval: parsed("JANITOR_INTERVAL_SECS")
                .map(|secs| Duration::from_secs(secs).max(MIN_JANITOR_INTERVAL))
                .unwrap_or(defaults.janitor_interval),
            janitor_stale_after: parsed("JANITOR_STALE_AFTER_SECS")
                .map(|secs| Duration::from_secs(secs).min(MAX_STALE_AFTER))
                .unwrap_or(defaults.janitor_stale_after),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Retry policy for confirm-availability calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.inventory_max_attempts, self.inventory_retry_delay)
    }

    /// Janitor scheduling.
    pub fn janitor_config(&self) -> JanitorConfig {
        let defaults = JanitorConfig::default();
        JanitorConfig {
            interval: self.janitor_interval,
            stale_after: chrono::Duration::from_std(self.janitor_stale_after.min(MAX_STALE_AFTER))
                .unwrap_or(defaults.stale_after),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            inventory_url: "http://localhost:8081/api".to_string(),
            inventory_timeout: saga::services::http::DEFAULT_TIMEOUT,
            inventory_max_attempts: saga::booking_creation::DEFAULT_MAX_ATTEMPTS,
            inventory_retry_delay: saga::booking_creation::DEFAULT_RETRY_DELAY,
            janitor_interval: saga::booking_creation::DEFAULT_JANITOR_INTERVAL,
            janitor_stale_after: saga::booking_creation::DEFAULT_STALE_AFTER,
        }
    }
}
