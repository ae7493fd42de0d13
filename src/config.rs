//! Service configuration from environment variables
//!
//! Environment:
//! - CONTRIB_DATABASE_URL: SQLite URL (default `sqlite://contributions.db`)
//! - CONTRIB_MAX_CONNECTIONS: pool size (default 5)
//! - CONTRIB_BOT_USER_IDS: comma-separated bot account ids (default none)
//! - CONTRIB_ROW_ESTIMATOR: `engine` or `exact` (default `engine`)
//! - CONTRIB_QUERY_TIMEOUT_MS: per-query read timeout (default 5000)
//! - CONTRIB_BIND: listen address (default `0.0.0.0:3040`)
//! - CONTRIB_STATS_REFRESH_SECS: engine statistics refresh period, `0` disables (default 300)
//!
//! Authentication variables are read by `JwtAuth::from_env`.

use std::net::SocketAddr;
use std::time::Duration;

use crate::log_store::{RowEstimator, StoreConfig};

const DEFAULT_STATS_REFRESH_SECS: u64 = 300;

/// Errors while reading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub bind: SocketAddr,
    /// Period of the background `ANALYZE`; `None` when disabled
    pub stats_refresh: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            bind: SocketAddr::from(([0, 0, 0, 0], 3040)),
            stats_refresh: Some(Duration::from_secs(DEFAULT_STATS_REFRESH_SECS)),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through a variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("CONTRIB_DATABASE_URL") {
            config.store.database_url = url;
        }

        if let Some(max) = lookup("CONTRIB_MAX_CONNECTIONS") {
            config.store.max_connections = parse_var("CONTRIB_MAX_CONNECTIONS", &max)?;
        }

        if let Some(ids) = lookup("CONTRIB_BOT_USER_IDS") {
            config.store.bot_user_ids = parse_bot_ids(&ids)?.into_iter().collect();
        }

        if let Some(estimator) = lookup("CONTRIB_ROW_ESTIMATOR") {
            config.store.row_estimator = estimator
                .parse::<RowEstimator>()
                .map_err(|reason| ConfigError::Invalid {
                    var: "CONTRIB_ROW_ESTIMATOR",
                    reason,
                })?;
        }

        if let Some(ms) = lookup("CONTRIB_QUERY_TIMEOUT_MS") {
            let ms: u64 = parse_var("CONTRIB_QUERY_TIMEOUT_MS", &ms)?;
            config.store.query_timeout = Duration::from_millis(ms);
        }

        if let Some(bind) = lookup("CONTRIB_BIND") {
            config.bind = parse_var("CONTRIB_BIND", &bind)?;
        }

        if let Some(secs) = lookup("CONTRIB_STATS_REFRESH_SECS") {
            let secs: u64 = parse_var("CONTRIB_STATS_REFRESH_SECS", &secs)?;
            config.stats_refresh = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

/// Parse "1,2, 3" into ids; blank entries are ignored
fn parse_bot_ids(value: &str) -> Result<Vec<i64>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| parse_var("CONTRIB_BOT_USER_IDS", id))
        .collect()
}
