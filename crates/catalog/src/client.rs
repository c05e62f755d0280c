use std::{future::Future, sync::Arc, time::Duration};

use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    cache::{CacheStats, CatalogCache},
    config::CatalogConfig,
    error::{CatalogError, Result},
    inflight::{InFlight, Joined},
    infrastructure::{parse_and_validate_url, parse_retry_after, HttpClientFactory, RateLimiter},
    metrics::{
        CATALOG_CACHE_LOOKUPS, CATALOG_REQUESTS, CATALOG_REQUEST_LATENCY, CATALOG_RETRIES,
        RATE_LIMIT_WAIT,
    },
    request::CatalogRequest,
    retry::RetryPolicy,
    token::TokenSupplier,
    types::{ListResponse, ListingKind, Offer, Publisher, Sku},
    version::sort_versions_desc,
};

/// Longest slice of an error body kept in error messages
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Cache plus in-flight registry for one listing kind
struct Listing<T: Clone> {
    kind: ListingKind,
    cache: Arc<CatalogCache<T>>,
    in_flight: InFlight<T>,
}

impl<T> Listing<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(kind: ListingKind, ttl: Duration) -> Self {
        Self { kind, cache: Arc::new(CatalogCache::new(ttl)), in_flight: InFlight::new() }
    }

    /// Serve `key` from cache, join a running fetch for it, or run `fetch`
    /// and cache its result.
    async fn get_or_fetch<F>(&self, key: String, fetch: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let operation = self.kind.as_str();

        if let Some(hit) = self.cache.get(&key) {
            CATALOG_CACHE_LOOKUPS.with_label_values(&[operation, "hit"]).inc();
            debug!(key = %key, "Catalog cache hit");
            return Ok(hit);
        }
        CATALOG_CACHE_LOOKUPS.with_label_values(&[operation, "miss"]).inc();
        debug!(key = %key, "Catalog cache miss");

        let cache = self.cache.clone();
        let cache_key = key.clone();
        let store = move |value: &T| cache.set(cache_key, value.clone());

        match self.in_flight.join_or_start(&key, || self.cache.peek(&key), fetch, store) {
            Joined::Ready(value) => Ok(value),
            Joined::Pending(pending) => pending.await,
        }
    }

    // Detach before clearing; a detached fetch never writes to the cache
    fn clear(&self) {
        self.in_flight.detach_all();
        self.cache.clear();
    }

    fn invalidate_scope(&self, prefix: &str) -> usize {
        let detached = self.in_flight.detach_prefix(prefix);
        if detached > 0 {
            debug!(kind = %self.kind, prefix = %prefix, detached, "Detached in-flight fetches");
        }
        self.cache.invalidate_by_prefix(prefix)
    }

    fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

struct ClientInner {
    http: Client,
    base_url: Url,
    api_version: String,
    default_location: String,
    tokens: Arc<dyn TokenSupplier>,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
    publishers: Listing<Vec<Publisher>>,
    offers: Listing<Vec<Offer>>,
    skus: Listing<Vec<Sku>>,
    versions: Listing<Vec<String>>,
}

/// Client for the VM image catalog (publishers, offers, SKUs, versions).
///
/// Cheap to clone; clones share cache, rate limiter window and in-flight
/// fetches. Separate instances built with `new` share nothing.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<ClientInner>,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig, tokens: Arc<dyn TokenSupplier>) -> Result<Self> {
        config.validate().map_err(|e| CatalogError::Configuration(format!("{e:#}")))?;

        let base_url = parse_and_validate_url(&config.base_url)
            .map_err(|e| CatalogError::Configuration(e.to_string()))?;
        let factory = HttpClientFactory::with_timeout(config.request_timeout());
        let http = factory
            .create_client()
            .map_err(|e| CatalogError::Configuration(format!("{e:#}")))?;

        let ttl = config.cache_ttl();
        let inner = ClientInner {
            http,
            base_url,
            api_version: config.api_version.clone(),
            default_location: config.default_location.clone(),
            tokens,
            rate_limiter: RateLimiter::new(
                config.rate_limit.max_requests_per_window,
                config.rate_limit.window(),
            ),
            retry: RetryPolicy::from_config(&config.retry),
            publishers: Listing::new(ListingKind::Publishers, ttl),
            offers: Listing::new(ListingKind::Offers, ttl),
            skus: Listing::new(ListingKind::Skus, ttl),
            versions: Listing::new(ListingKind::Versions, ttl),
        };

        info!(
            base_url = %inner.base_url,
            api_version = %inner.api_version,
            request_timeout_ms = factory.timeout().as_millis() as u64,
            cache_ttl_secs = ttl.as_secs(),
            max_requests_per_window = config.rate_limit.max_requests_per_window,
            window_ms = config.rate_limit.window_ms,
            "Catalog client ready"
        );

        Ok(Self { inner: Arc::new(inner) })
    }

    /// Publishers offering images in `location` (default location if omitted)
    pub async fn list_publishers(
        &self,
        subscription_id: &str,
        location: Option<&str>,
    ) -> Result<Vec<Publisher>> {
        require("subscription id", subscription_id)?;
        let request = CatalogRequest::publishers(subscription_id, self.inner.location(location));
        self.inner.load_publishers(request).await
    }

    pub async fn list_offers(
        &self,
        subscription_id: &str,
        publisher: &str,
        location: Option<&str>,
    ) -> Result<Vec<Offer>> {
        require("subscription id", subscription_id)?;
        require("publisher", publisher)?;
        let request =
            CatalogRequest::offers(subscription_id, self.inner.location(location), publisher);
        self.inner.load_offers(request).await
    }

    /// SKUs of an offer, each with its versions newest first.
    ///
    /// A SKU whose version lookup fails is still returned, with no versions.
    pub async fn list_skus(
        &self,
        subscription_id: &str,
        publisher: &str,
        offer: &str,
        location: Option<&str>,
    ) -> Result<Vec<Sku>> {
        require("subscription id", subscription_id)?;
        require("publisher", publisher)?;
        require("offer", offer)?;
        let request =
            CatalogRequest::skus(subscription_id, self.inner.location(location), publisher, offer);
        self.inner.load_skus(request).await
    }

    /// Versions of one SKU, newest first
    pub async fn list_versions(
        &self,
        subscription_id: &str,
        publisher: &str,
        offer: &str,
        sku: &str,
        location: Option<&str>,
    ) -> Result<Vec<String>> {
        require("subscription id", subscription_id)?;
        require("publisher", publisher)?;
        require("offer", offer)?;
        require("sku", sku)?;
        let request = CatalogRequest::versions(
            subscription_id,
            self.inner.location(location),
            publisher,
            offer,
            sku,
        );
        self.inner.load_versions(request).await
    }

    /// Drop every cached listing
    pub fn clear_cache(&self) {
        let inner = &self.inner;
        inner.publishers.clear();
        inner.offers.clear();
        inner.skus.clear();
        inner.versions.clear();
        info!("Cleared catalog cache");
    }

    /// Drop cached listings for one subscription; returns how many were removed
    pub fn clear_cache_for_subscription(&self, subscription_id: &str) -> usize {
        let prefix = CatalogRequest::subscription_scope(subscription_id);
        let inner = &self.inner;
        let removed = inner.publishers.invalidate_scope(&prefix) +
            inner.offers.invalidate_scope(&prefix) +
            inner.skus.invalidate_scope(&prefix) +
            inner.versions.invalidate_scope(&prefix);
        info!(
            subscription_id = %subscription_id,
            removed,
            "Cleared catalog cache for subscription"
        );
        removed
    }

    /// Combined statistics over all listing caches
    pub fn cache_stats(&self) -> CacheStats {
        let inner = &self.inner;
        inner.publishers.stats() +
            inner.offers.stats() +
            inner.skus.stats() +
            inner.versions.stats()
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

impl ClientInner {
    fn location<'a>(&'a self, location: Option<&'a str>) -> &'a str {
        match location {
            Some(location) if !location.trim().is_empty() => location,
            _ => &self.default_location,
        }
    }

    async fn load_publishers(self: &Arc<Self>, request: CatalogRequest) -> Result<Vec<Publisher>> {
        let inner = self.clone();
        let key = request.cache_key();
        self.publishers
            .get_or_fetch(key, async move {
                let names = inner.fetch_names(&request).await?;
                let publishers =
                    names.into_iter().map(|name| Publisher::new(name, &request.location)).collect();
                Ok::<_, CatalogError>(publishers)
            })
            .await
    }

    async fn load_offers(self: &Arc<Self>, request: CatalogRequest) -> Result<Vec<Offer>> {
        let inner = self.clone();
        let key = request.cache_key();
        self.offers
            .get_or_fetch(key, async move {
                let names = inner.fetch_names(&request).await?;
                let publisher = request.publisher.as_deref().unwrap_or_default();
                let offers = names
                    .into_iter()
                    .map(|name| Offer::new(name, publisher, &request.location))
                    .collect();
                Ok::<_, CatalogError>(offers)
            })
            .await
    }

    async fn load_skus(self: &Arc<Self>, request: CatalogRequest) -> Result<Vec<Sku>> {
        let inner = self.clone();
        let key = request.cache_key();
        self.skus
            .get_or_fetch(key, async move {
                let names = inner.fetch_names(&request).await?;
                let publisher = request.publisher.as_deref().unwrap_or_default();
                let offer = request.offer.as_deref().unwrap_or_default();

                let lookups = names.iter().map(|sku| {
                    let versions = CatalogRequest::versions(
                        &request.subscription,
                        &request.location,
                        publisher,
                        offer,
                        sku,
                    );
                    inner.load_versions(versions)
                });
                let results = join_all(lookups).await;

                let skus = names
                    .into_iter()
                    .zip(results)
                    .map(|(name, versions)| {
                        let versions = versions.unwrap_or_else(|e| {
                            warn!(
                                publisher = %publisher,
                                offer = %offer,
                                sku = %name,
                                error = %e,
                                "Failed to fetch SKU versions, listing SKU without versions"
                            );
                            Vec::new()
                        });
                        Sku::new(name, publisher, offer, &request.location, versions)
                    })
                    .collect();
                Ok::<_, CatalogError>(skus)
            })
            .await
    }

    async fn load_versions(self: &Arc<Self>, request: CatalogRequest) -> Result<Vec<String>> {
        let inner = self.clone();
        let key = request.cache_key();
        self.versions
            .get_or_fetch(key, async move {
                let mut versions = inner.fetch_names(&request).await?;
                sort_versions_desc(&mut versions);
                Ok::<_, CatalogError>(versions)
            })
            .await
    }

    /// Issue the request with retries; returns the `name` of every entry.
    async fn fetch_names(&self, request: &CatalogRequest) -> Result<Vec<String>> {
        let kind = request.kind();
        let url = request.endpoint(&self.base_url, &self.api_version)?;
        let mut attempt = 0;

        loop {
            let err = match self.send_once(kind, &url).await {
                Ok(names) => return Ok(names),
                Err(err) => err,
            };

            if self.retry.should_retry(attempt, &err) {
                let delay = self.retry.delay_for(attempt, err.retry_after());
                CATALOG_RETRIES.with_label_values(&[kind.as_str()]).inc();
                warn!(
                    operation = %kind,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Catalog request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            error!(
                operation = %kind,
                attempts = attempt + 1,
                error = %err,
                "Catalog request failed"
            );

            if err.is_retryable() {
                return Err(CatalogError::RetriesExhausted {
                    attempts: attempt + 1,
                    last: Box::new(err),
                });
            }
            return Err(err);
        }
    }

    /// One admitted, authenticated request
    async fn send_once(&self, kind: ListingKind, url: &Url) -> Result<Vec<String>> {
        let operation = kind.as_str();

        let waited = self.rate_limiter.acquire().await;
        RATE_LIMIT_WAIT.observe(waited.as_secs_f64());

        let token = self
            .tokens
            .bearer_token()
            .await
            .map_err(|e| CatalogError::TokenAcquisition(format!("{e:#}")))?;

        debug!(operation, url = %url, "Sending catalog request");
        let timer = CATALOG_REQUEST_LATENCY.with_label_values(&[operation]).start_timer();
        let sent = self.http.get(url.clone()).bearer_auth(token).send().await;
        timer.observe_duration();

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                CATALOG_REQUESTS.with_label_values(&[operation, "network_error"]).inc();
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            CATALOG_REQUESTS.with_label_values(&[operation, status.as_str()]).inc();
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(CatalogError::from_status(status.as_u16(), retry_after, message));
        }
        CATALOG_REQUESTS.with_label_values(&[operation, "success"]).inc();

        let body = response.bytes().await?;
        let parsed: ListResponse = serde_json::from_slice(&body)?;
        let records = parsed.value.ok_or_else(|| {
            CatalogError::Parse(format!("{kind} response is missing the `value` list"))
        })?;

        Ok(records.into_iter().map(|record| record.name).collect())
    }
}
