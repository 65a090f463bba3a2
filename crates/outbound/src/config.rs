//! Shipment API configuration.
//!
//! Loads settings from environment variables. A `.env` file in the working
//! directory is read first if present.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `STOCKROOM_API_URL` | yes | |
//! | `STOCKROOM_STORE_ID` | yes | |
//! | `STOCKROOM_TIMEOUT_SECS` | no | `30` |
//! | `STOCKROOM_LOG_FORMAT` | no | `pretty` (`pretty` or `json`) |

use std::str::FromStr;
use std::time::Duration;

use stockroom_core::StoreId;
use thiserror::Error;
use url::Url;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

/// Settings for talking to the shipment API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// GraphQL endpoint.
    pub api_url: Url,
    /// Store every request is scoped to.
    pub store_id: StoreId,
    /// Per-request timeout.
    pub timeout: Duration,
    pub log_format: LogFormat,
}

const DEFAULT_TIMEOUT_SECS: &str = "30";

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = get_required(&lookup, "STOCKROOM_API_URL")?;
        let api_url = Url::parse(&api_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOCKROOM_API_URL".to_string(), e.to_string())
        })?;

        let store_id = StoreId::new(get_required(&lookup, "STOCKROOM_STORE_ID")?);

        let timeout_secs: u64 = get_or_default(&lookup, "STOCKROOM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .parse()
            .map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnvVar("STOCKROOM_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let log_format = get_or_default(&lookup, "STOCKROOM_LOG_FORMAT", "pretty")
            .parse()
            .map_err(|e| ConfigError::InvalidEnvVar("STOCKROOM_LOG_FORMAT".to_string(), e))?;

        Ok(Self {
            api_url,
            store_id,
            timeout: Duration::from_secs(timeout_secs),
            log_format,
        })
    }
}

fn get_required(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_or_default(lookup: impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}
