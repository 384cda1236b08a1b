//! Client configuration.
//!
//! Only two knobs matter to the data layer: where the API lives and how
//! long to wait for it. Everything else (cache behavior, refresh protocol)
//! is fixed by the server contract.

use serde::{Deserialize, Serialize};

/// Default API base URL. The notes server listens on 3500 in development.
const DEFAULT_BASE_URL: &str = "http://localhost:3500";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding the API base URL.
const BASE_URL_ENV: &str = "NOTES_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Default configuration with the base URL taken from `NOTES_API_URL`
    /// when set.
    pub fn from_env() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self {
                base_url: url,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}
