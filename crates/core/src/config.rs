//! Client configuration.
//!
//! Everything is read from the process environment at startup; tests build a
//! config directly or through [`ClientConfig::from_lookup`].

use std::time::Duration;

use thiserror::Error;

pub const ENV_API_BASE_URL: &str = "SITEKIT_API_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "SITEKIT_REQUEST_TIMEOUT_SECS";
pub const ENV_STORAGE_PREFIX: &str = "SITEKIT_STORAGE_PREFIX";

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_STORAGE_PREFIX: &str = "sitekit";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Names of the three persisted session keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub access_token: String,
    pub refresh_token: String,
    pub user: String,
}

impl StorageKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            access_token: format!("{prefix}.access_token"),
            refresh_token: format!("{prefix}.refresh_token"),
            user: format!("{prefix}.user"),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_STORAGE_PREFIX)
    }
}

/// Slide parameters for auth card transitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationConfig {
    /// Horizontal distance (px) a card travels when leaving or entering.
    pub offset_px: f64,
    /// Duration of each half (exit, entry) of a transition.
    pub duration: Duration,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            offset_px: 40.0,
            duration: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API base URL without a trailing slash.
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub storage_keys: StorageKeys,
    pub card_animation: AnimationConfig,
}

impl ClientConfig {
    pub fn new(api_base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url)?,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            storage_keys: StorageKeys::default(),
            card_animation: AnimationConfig::default(),
        })
    }

    /// Load from `SITEKIT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = lookup(ENV_API_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_API_BASE_URL))?;
        let mut config = Self::new(&base)?;

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: ENV_REQUEST_TIMEOUT_SECS,
                value: raw.clone(),
                reason: "expected a whole number of seconds",
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    key: ENV_REQUEST_TIMEOUT_SECS,
                    value: raw,
                    reason: "must be greater than zero",
                });
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(prefix) = lookup(ENV_STORAGE_PREFIX) {
            let prefix = prefix.trim();
            if !prefix.is_empty() {
                config.storage_keys = StorageKeys::with_prefix(prefix);
            }
        }

        tracing::debug!(
            api_base_url = %config.api_base_url,
            timeout_secs = config.request_timeout.as_secs(),
            "client configuration loaded"
        );
        Ok(config)
    }

    /// Join an endpoint path (`/login`, `reports/7`) onto the base URL.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            key: ENV_API_BASE_URL,
            value: raw.to_string(),
            reason: "must start with http:// or https://",
        });
    }
    if trimmed.split("://").nth(1).is_none_or(str::is_empty) {
        return Err(ConfigError::Invalid {
            key: ENV_API_BASE_URL,
            value: raw.to_string(),
            reason: "missing host",
        });
    }
    Ok(trimmed.to_string())
}
