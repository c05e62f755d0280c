use std::time::{Duration, SystemTime};

use reqwest::header::{HeaderMap, RETRY_AFTER};

use super::error::{Error, Result};

/// Parse and validate an API base URL
///
/// # Errors
///
/// Returns an error if:
/// - The URL cannot be parsed
/// - The URL has no host
/// - The URL is not HTTPS and does not point at a loopback host
pub fn parse_and_validate_url(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url)
        .map_err(|e| Error::InvalidUrl(format!("Failed to parse URL '{url}': {e}")))?;

    let host =
        parsed.host_str().ok_or_else(|| Error::InvalidUrl(format!("URL '{url}' has no host")))?;

    match parsed.scheme() {
        "https" => {}
        // Plain HTTP only for local mock endpoints
        "http" if is_loopback(host) => {}
        _ => return Err(Error::InvalidUrl(format!("URL '{url}' must use HTTPS scheme"))),
    }

    Ok(parsed)
}

#[must_use]
fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "::1" | "[::1]") || host.starts_with("127.")
}

/// Read a `Retry-After` header, either delay-seconds or an HTTP-date.
///
/// A date already in the past yields a zero delay.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = httpdate::parse_http_date(value).ok()?;
    Some(at.duration_since(SystemTime::now()).unwrap_or(Duration::ZERO))
}
