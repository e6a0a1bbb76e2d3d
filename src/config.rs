use std::str::FromStr;
use std::time::Duration;

use crate::context::DEFAULT_REQUEST_TIMEOUT;

// ============================================================================
// Configuration - read from the environment
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Order ledger
    pub database_url: String,
    /// Account directory tables; in-memory demo directory when unset
    pub account_database_url: Option<String>,
    /// Catalog tables; in-memory demo catalog when unset
    pub catalog_database_url: Option<String>,
    pub request_timeout: Duration,
    /// `None` disables the catalog cache
    pub catalog_cache_ttl: Option<Duration>,
    pub db_max_connections: u32,
    pub db_connect_attempts: u32,
    pub db_connect_delay: Duration,
    pub metrics_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let request_timeout = Duration::from_millis(parse_or(
            &get,
            "REQUEST_TIMEOUT_MS",
            DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
        )?);
        let cache_ttl_secs: u64 = parse_or(&get, "CATALOG_CACHE_TTL_SECS", 0)?;

        Ok(Self {
            database_url,
            account_database_url: get("ACCOUNT_DATABASE_URL"),
            catalog_database_url: get("CATALOG_DATABASE_URL"),
            request_timeout,
            catalog_cache_ttl: (cache_ttl_secs > 0).then(|| Duration::from_secs(cache_ttl_secs)),
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 5)?,
            db_connect_attempts: parse_or(&get, "DB_CONNECT_ATTEMPTS", 3)?,
            db_connect_delay: Duration::from_millis(parse_or(&get, "DB_CONNECT_DELAY_MS", 5000)?),
            metrics_port: parse_or(&get, "METRICS_PORT", 9090)?,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
