//! Application configuration loaded from environment variables.

use std::time::Duration;

use payment::PaymobConfig;
use thiserror::Error;

/// Raised when the environment does not describe a runnable server.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Server configuration.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `PAYMENT_TIMEOUT_SECS`: gateway request timeout (default: `15`)
/// - `PAYMOB_API_KEY`, `PAYMOB_INTEGRATION_ID`, `PAYMOB_IFRAME_ID`, `PAYMOB_HMAC`: required
/// - `PAYMOB_BASE_URL`, `PAYMOB_IFRAME_URL`, `PAYMOB_CURRENCY`: optional overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub payment_timeout: Duration,
    pub paymob: PaymobConfig,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let integration_id = parse(&lookup, "PAYMOB_INTEGRATION_ID")?
            .ok_or(ConfigError::Missing("PAYMOB_INTEGRATION_ID"))?;

        let mut paymob = PaymobConfig::new(
            required("PAYMOB_API_KEY")?,
            integration_id,
            required("PAYMOB_IFRAME_ID")?,
            required("PAYMOB_HMAC")?,
        );
        if let Some(base_url) = lookup("PAYMOB_BASE_URL") {
            paymob.base_url = base_url;
        }
        if let Some(iframe_url) = lookup("PAYMOB_IFRAME_URL") {
            paymob.iframe_url = iframe_url;
        }
        if let Some(currency) = lookup("PAYMOB_CURRENCY") {
            paymob.currency = currency;
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse(&lookup, "PORT")?.unwrap_or(3000),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            database_url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
            database_max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(10),
            payment_timeout: Duration::from_secs(
                parse(&lookup, "PAYMENT_TIMEOUT_SECS")?.unwrap_or(15),
            ),
            paymob,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
