use std::{path::Path, time::Duration};

use eyre::{bail, Result, WrapErr};
use serde::Deserialize;

use crate::infrastructure::parse_and_validate_url;

pub const DEFAULT_BASE_URL: &str = "https://management.azure.com";
pub const DEFAULT_API_VERSION: &str = "2023-03-01";
pub const DEFAULT_LOCATION: &str = "eastus";

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in seconds
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Randomize backoff delays within the computed bound
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            jitter: default_jitter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per sliding window
    #[serde(default = "default_max_requests_per_window")]
    pub max_requests_per_window: usize,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: default_max_requests_per_window(),
            window_ms: default_window_ms(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Management API root, e.g. `https://management.azure.com`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Value of the `api-version` query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Location used when a caller omits one
    #[serde(default = "default_location")]
    pub default_location: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Lifetime of cached listings in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            default_location: default_location(),
            request_timeout_ms: default_request_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_max_requests_per_window() -> usize {
    10
}

fn default_window_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_secs() -> u64 {
    10
}

fn default_jitter() -> bool {
    true
}

impl CatalogConfig {
    /// Parse a TOML document; missing fields take their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).wrap_err("Failed to parse catalog config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        parse_and_validate_url(&self.base_url)
            .map_err(|e| eyre::eyre!("Invalid catalog base URL: {}", e))?;

        if self.api_version.trim().is_empty() {
            bail!("API version must not be empty");
        }

        if self.default_location.trim().is_empty() {
            bail!("Default location must not be empty");
        }

        if self.request_timeout_ms < 1 || self.request_timeout_ms > 300_000 {
            bail!("Request timeout must be between 1ms and 5 minutes");
        }

        if self.rate_limit.max_requests_per_window < 1 {
            bail!("Rate limit must admit at least one request per window");
        }

        if self.rate_limit.window_ms < 1 {
            bail!("Rate limit window must be at least 1ms");
        }

        if self.retry.max_retries > 10 {
            bail!("Max retries must be <= 10");
        }

        if self.retry.initial_backoff_ms < 1 || self.retry.initial_backoff_ms > 60_000 {
            bail!("Initial backoff must be between 1ms and 60 seconds");
        }

        if self.retry.max_backoff_secs > 300 {
            bail!("Max backoff must be <= 5 minutes");
        }

        if self.retry.max_backoff_secs * 1000 < self.retry.initial_backoff_ms {
            bail!("Max backoff must not be below the initial backoff");
        }

        Ok(())
    }
}
