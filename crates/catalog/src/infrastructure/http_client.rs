use std::time::Duration;

use eyre::{Result, WrapErr};
use reqwest::{Client, ClientBuilder};

/// HTTP client factory with connection pooling and timeouts
pub struct HttpClientFactory {
    default_timeout: Duration,
    max_idle_per_host: usize,
}

impl HttpClientFactory {
    /// Create a new HTTP client factory with default settings
    pub fn new() -> Self {
        Self { default_timeout: Duration::from_secs(30), max_idle_per_host: 10 }
    }

    /// Factory whose clients abort any request running longer than `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { default_timeout: timeout, ..Self::new() }
    }

    pub fn timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Create a new HTTP client with connection pooling
    pub fn create_client(&self) -> Result<Client> {
        ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(self.max_idle_per_host)
            .timeout(self.default_timeout)
            .build()
            .wrap_err("Failed to create HTTP client")
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new()
    }
}
