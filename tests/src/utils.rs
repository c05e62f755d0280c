use std::sync::{Arc, Once};

use catalog_client::{CatalogClient, CatalogConfig, StaticTokenSupplier};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a test subscriber once per process; honours `RUST_LOG`
pub fn setup_test_env() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Client config aimed at a mock catalog, with fast and deterministic retries
pub fn test_config(base_url: &str) -> CatalogConfig {
    let mut config = CatalogConfig { base_url: base_url.to_string(), ..Default::default() };
    config.retry.initial_backoff_ms = 10;
    config.retry.max_backoff_secs = 1;
    config.retry.jitter = false;
    config.rate_limit.max_requests_per_window = 100;
    config
}

pub fn test_client(config: CatalogConfig) -> eyre::Result<CatalogClient> {
    Ok(CatalogClient::new(config, Arc::new(StaticTokenSupplier::new("integration-token")))?)
}
