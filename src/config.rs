// =============================================================================
// CONFIGURATION MODULE
// =============================================================================
// Loads configuration from environment variables (and `.env` via dotenvy).
//
// One source of truth for the store backend URL: `STORE_API_URL`, falling
// back to the dashboard's `NEXT_PUBLIC_API_URL`, then to the local default.
// =============================================================================

use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_STORE_API_URL: &str = "http://localhost:8080/api/v1";

// -----------------------------------------------------------------------------
// CONFIG STRUCT
// -----------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 8003)
    pub port: u16,

    /// Base URL of the store REST backend, without trailing slash
    pub store_api_url: String,

    /// Redis connection URL
    /// Format: redis://:password@host:port/db_number
    pub redis_url: String,

    /// Timeout for each backend request
    pub upstream_timeout: Duration,

    /// Order → inventory sync period; `None` disables the timer
    pub order_sync_interval: Option<Duration>,

    /// Service token used by the sync timer. The timer stays off without it.
    pub admin_api_token: Option<String>,

    /// Delay before refreshing inventory gauges after a manual sync
    pub sync_refresh_delay: Duration,

    /// Expiry of the reconciliation lock in Redis
    pub sync_lock_ttl: Duration,

    /// Largest accepted upload body
    pub max_upload_bytes: usize,
}

impl Config {
    // -------------------------------------------------------------------------
    // LOAD CONFIGURATION FROM ENVIRONMENT
    // -------------------------------------------------------------------------
    /// Creates a Config by reading environment variables.
    ///
    /// # Returns
    /// - `Ok(Config)` if all required variables are set and parse
    /// - `Err` if `REDIS_URL` is missing or a number does not parse
    pub fn from_env() -> Result<Self> {
        let store_api_url = env::var("STORE_API_URL")
            .or_else(|_| env::var("NEXT_PUBLIC_API_URL"))
            .unwrap_or_else(|_| DEFAULT_STORE_API_URL.to_string());
        let store_api_url = store_api_url.trim_end_matches('/').to_string();
        if !store_api_url.starts_with("http://") && !store_api_url.starts_with("https://") {
            bail!("STORE_API_URL must be an http(s) URL, got '{}'", store_api_url);
        }

        let order_sync_secs: u64 = parse_var("ORDER_SYNC_INTERVAL_SECS", 0)?;

        Ok(Self {
            port: parse_var("PORT", 8003)?,

            store_api_url,

            redis_url: env::var("REDIS_URL")
                .context("REDIS_URL environment variable is required")?,

            upstream_timeout: Duration::from_secs(parse_var("UPSTREAM_TIMEOUT_SECS", 15)?),

            order_sync_interval: (order_sync_secs > 0)
                .then(|| Duration::from_secs(order_sync_secs)),

            admin_api_token: env::var("ADMIN_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),

            sync_refresh_delay: Duration::from_millis(parse_var("SYNC_REFRESH_DELAY_MS", 1000)?),

            sync_lock_ttl: Duration::from_secs(parse_var("SYNC_LOCK_TTL_SECS", 120)?),

            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }
}

/// Read and parse an optional variable, falling back to `default` when unset
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {} as a number", name)),
        Err(_) => Ok(default),
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Environment variables are process-wide; keep everything in one test
    #[test]
    fn test_config_from_env() {
        env::set_var("PORT", "9100");
        env::set_var("STORE_API_URL", "http://store.internal:5000/api/v1/");
        env::set_var("REDIS_URL", "redis://localhost:6379");
        env::set_var("ORDER_SYNC_INTERVAL_SECS", "300");
        env::remove_var("ADMIN_API_TOKEN");

        let config = Config::from_env().expect("Failed to load config");

        assert_eq!(config.port, 9100);
        assert_eq!(config.store_api_url, "http://store.internal:5000/api/v1");
        assert_eq!(config.order_sync_interval, Some(Duration::from_secs(300)));
        assert!(config.admin_api_token.is_none());
        assert_eq!(config.sync_refresh_delay, Duration::from_millis(1000));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);

        // Falls back to the dashboard's variable, then to the default
        env::remove_var("STORE_API_URL");
        env::set_var("NEXT_PUBLIC_API_URL", "https://api.shop.test/api/v1");
        let config = Config::from_env().unwrap();
        assert_eq!(config.store_api_url, "https://api.shop.test/api/v1");

        env::remove_var("NEXT_PUBLIC_API_URL");
        env::set_var("ORDER_SYNC_INTERVAL_SECS", "0");
        let config = Config::from_env().unwrap();
        assert_eq!(config.store_api_url, DEFAULT_STORE_API_URL);
        assert!(config.order_sync_interval.is_none());

        env::set_var("PORT", "not-a-port");
        assert!(Config::from_env().is_err());

        env::remove_var("PORT");
        env::remove_var("REDIS_URL");
        env::remove_var("ORDER_SYNC_INTERVAL_SECS");
        assert!(Config::from_env().is_err());
    }
}
