use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::debug;

const API_VERSION: &str = "2023-03-01";

/// Bind on an ephemeral loopback port and serve the mock catalog.
///
/// Returns the base URL to point a client at.
pub async fn start_mock_catalog_service(state: Arc<MockCatalogState>) -> eyre::Result<String> {
    let app = mock_catalog_app_router(state);

    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Mock catalog service stopped");
        }
    });

    Ok(format!("http://{addr}"))
}

pub fn publishers_path(subscription: &str, location: &str) -> String {
    format!(
        "/subscriptions/{subscription}/providers/Microsoft.Compute/locations/{location}/publishers"
    )
}

pub fn offers_path(subscription: &str, location: &str, publisher: &str) -> String {
    format!(
        "{}/{publisher}/artifacttypes/vmimage/offers",
        publishers_path(subscription, location)
    )
}

pub fn skus_path(subscription: &str, location: &str, publisher: &str, offer: &str) -> String {
    format!("{}/{offer}/skus", offers_path(subscription, location, publisher))
}

pub fn versions_path(
    subscription: &str,
    location: &str,
    publisher: &str,
    offer: &str,
    sku: &str,
) -> String {
    format!("{}/{sku}/versions", skus_path(subscription, location, publisher, offer))
}

/// Scripted catalog API: listings by path, request counters, injected
/// failures and latency.
pub struct MockCatalogState {
    listings: RwLock<HashMap<String, Vec<String>>>,
    scripted: RwLock<HashMap<String, VecDeque<StatusCode>>>,
    received: RwLock<HashMap<String, u64>>,
    received_total: Arc<AtomicU64>,
    response_override: RwLock<Option<StatusCode>>,
    delay: RwLock<Duration>,
    retry_after_secs: RwLock<Option<u64>>,
}

impl MockCatalogState {
    pub fn new() -> Self {
        Self {
            listings: RwLock::new(HashMap::new()),
            scripted: RwLock::new(HashMap::new()),
            received: RwLock::new(HashMap::new()),
            received_total: Default::default(),
            response_override: RwLock::new(None),
            delay: RwLock::new(Duration::ZERO),
            retry_after_secs: RwLock::new(None),
        }
    }

    /// Serve `names` at `path`
    pub fn with_listing(self, path: impl Into<String>, names: &[&str]) -> Self {
        self.set_listing(path, names);
        self
    }

    /// Delay every successful response by `delay`
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write().unwrap() = delay;
        self
    }

    pub fn set_listing(&self, path: impl Into<String>, names: &[&str]) {
        self.listings
            .write()
            .unwrap()
            .insert(path.into(), names.iter().map(|name| name.to_string()).collect());
    }

    /// Answer the next requests to `path` with `statuses`, in order
    pub fn script_failures(&self, path: impl Into<String>, statuses: &[StatusCode]) {
        self.scripted.write().unwrap().entry(path.into()).or_default().extend(statuses);
    }

    /// Answer every request with `status` until cleared
    pub fn set_response_override(&self, status: StatusCode) {
        *self.response_override.write().unwrap() = Some(status);
    }

    pub fn clear_response_override(&self) {
        *self.response_override.write().unwrap() = None;
    }

    /// `Retry-After` sent with 429 responses
    pub fn set_retry_after(&self, secs: u64) {
        *self.retry_after_secs.write().unwrap() = Some(secs);
    }

    pub fn received(&self, path: &str) -> u64 {
        self.received.read().unwrap().get(path).copied().unwrap_or_default()
    }

    pub fn received_total(&self) -> u64 {
        self.received_total.load(Ordering::Relaxed)
    }

    fn record(&self, path: &str) {
        self.received_total.fetch_add(1, Ordering::Relaxed);
        *self.received.write().unwrap().entry(path.to_string()).or_default() += 1;
    }

    fn next_failure(&self, path: &str) -> Option<StatusCode> {
        if let Some(status) = *self.response_override.read().unwrap() {
            return Some(status);
        }
        self.scripted.write().unwrap().get_mut(path).and_then(VecDeque::pop_front)
    }
}

impl Default for MockCatalogState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn mock_catalog_app_router(state: Arc<MockCatalogState>) -> Router {
    Router::new().route("/{*path}", get(handle_listing)).with_state(state)
}

async fn handle_listing(
    State(state): State<Arc<MockCatalogState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let path = uri.path().to_string();
    state.record(&path);
    debug!(path = %path, "Mock catalog received request");

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer ") && value.len() > "Bearer ".len());
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "missing bearer token").into_response();
    }

    let expected_version = format!("api-version={API_VERSION}");
    if !uri.query().is_some_and(|query| query.split('&').any(|pair| pair == expected_version)) {
        return (StatusCode::BAD_REQUEST, "missing api-version").into_response();
    }

    if let Some(status) = state.next_failure(&path) {
        let retry_after = *state.retry_after_secs.read().unwrap();
        let mut response = (status, "scripted failure").into_response();
        if let (StatusCode::TOO_MANY_REQUESTS, Some(secs)) = (status, retry_after) {
            response.headers_mut().insert(header::RETRY_AFTER, secs.into());
        }
        return response;
    }

    let delay = *state.delay.read().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let names = state.listings.read().unwrap().get(&path).cloned();
    match names {
        Some(names) => {
            let records: Vec<_> =
                names.iter().map(|name| serde_json::json!({ "name": name })).collect();
            Json(serde_json::json!({ "value": records })).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no such listing").into_response(),
    }
}
