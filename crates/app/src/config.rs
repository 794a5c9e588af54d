//! Runtime configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use pantry_detection::ExpiryPolicy;
use pantry_detection::http::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use pantry_observability::LogFormat;

pub const ENV_DB_PATH: &str = "PANTRY_DB_PATH";
pub const ENV_DETECT_URL: &str = "PANTRY_DETECT_URL";
pub const ENV_DETECT_API_KEY: &str = "PANTRY_DETECT_API_KEY";
pub const ENV_DETECT_TIMEOUT_SECS: &str = "PANTRY_DETECT_TIMEOUT_SECS";
pub const ENV_CATALOG_PATH: &str = "PANTRY_CATALOG_PATH";
pub const ENV_EXPIRY_DAYS: &str = "PANTRY_EXPIRY_DAYS";
pub const ENV_LOG_FORMAT: &str = "PANTRY_LOG_FORMAT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("cannot determine a data directory; set PANTRY_DB_PATH")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub detect_url: String,
    pub detect_api_key: Option<String>,
    pub detect_timeout: Duration,
    pub catalog_path: Option<PathBuf>,
    pub expiry_policy: ExpiryPolicy,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let db_path = match get(ENV_DB_PATH) {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let detect_timeout = match get(ENV_DETECT_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::Invalid {
                        var: ENV_DETECT_TIMEOUT_SECS,
                        reason: format!("expected a positive number of seconds, got `{raw}`"),
                    });
                }
                Ok(secs) => Duration::from_secs(secs),
            },
            None => DEFAULT_TIMEOUT,
        };

        let expiry_policy = match get(ENV_EXPIRY_DAYS) {
            Some(raw) => raw
                .parse::<u32>()
                .map(ExpiryPolicy::DaysAfterCapture)
                .map_err(|_| ConfigError::Invalid {
                    var: ENV_EXPIRY_DAYS,
                    reason: format!("expected a number of days, got `{raw}`"),
                })?,
            None => ExpiryPolicy::Unknown,
        };

        let log_format = match get(ENV_LOG_FORMAT) {
            Some(raw) => raw.parse::<LogFormat>().map_err(|e| ConfigError::Invalid {
                var: ENV_LOG_FORMAT,
                reason: e.to_string(),
            })?,
            None => LogFormat::Text,
        };

        Ok(Self {
            db_path,
            detect_url: get(ENV_DETECT_URL).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            detect_api_key: get(ENV_DETECT_API_KEY),
            detect_timeout,
            catalog_path: get(ENV_CATALOG_PATH).map(PathBuf::from),
            expiry_policy,
            log_format,
        })
    }
}

fn default_db_path() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join("pantry").join("pantry.db"))
        .ok_or(ConfigError::NoDataDir)
}
