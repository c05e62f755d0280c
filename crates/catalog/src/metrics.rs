use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, Histogram, HistogramVec,
    IntCounterVec,
};

lazy_static! {
    /// Outbound catalog API requests by listing kind and outcome
    pub static ref CATALOG_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "catalog_requests_total",
        "Outbound catalog API requests",
        &["operation", "outcome"]
    )
    .expect("Failed to register catalog requests metric");

    /// Cache lookups by listing kind and result
    pub static ref CATALOG_CACHE_LOOKUPS: IntCounterVec = register_int_counter_vec!(
        "catalog_cache_lookups_total",
        "Catalog cache lookups",
        &["operation", "result"]
    )
    .expect("Failed to register catalog cache lookups metric");

    /// Retries scheduled by listing kind
    pub static ref CATALOG_RETRIES: IntCounterVec = register_int_counter_vec!(
        "catalog_retries_total",
        "Catalog API requests retried after a transient failure",
        &["operation"]
    )
    .expect("Failed to register catalog retries metric");

    /// Request latency by listing kind
    pub static ref CATALOG_REQUEST_LATENCY: HistogramVec = register_histogram_vec!(
        "catalog_request_latency_seconds",
        "Latency of single catalog API requests",
        &["operation"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register catalog request latency metric");

    /// Time spent waiting for a rate limiter slot
    pub static ref RATE_LIMIT_WAIT: Histogram = register_histogram!(
        "catalog_rate_limit_wait_seconds",
        "Time spent waiting for rate limiter admission",
        vec![0.0, 0.01, 0.1, 0.5, 1.0, 5.0]
    )
    .expect("Failed to register rate limit wait metric");
}

/// Initialize all metrics and return them for registration
pub fn init_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CATALOG_REQUESTS.clone()),
        Box::new(CATALOG_CACHE_LOOKUPS.clone()),
        Box::new(CATALOG_RETRIES.clone()),
        Box::new(CATALOG_REQUEST_LATENCY.clone()),
        Box::new(RATE_LIMIT_WAIT.clone()),
    ]
}
