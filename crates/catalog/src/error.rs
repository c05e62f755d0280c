use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by catalog operations.
///
/// Cloneable so that one in-flight fetch can resolve every caller waiting on
/// the same cache key.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication failed (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Authorization failed (HTTP {status}): {message}")]
    Authorization { status: u16, message: String },

    #[error("Rate limited by catalog API (HTTP 429): {message}")]
    RateLimited { retry_after: Option<Duration>, message: String },

    #[error("Catalog API server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Catalog API rejected request (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    #[error("Network error: {message}")]
    Network { message: String, timeout: bool },

    #[error("Failed to parse catalog response: {0}")]
    Parse(String),

    #[error("Failed to acquire bearer token: {0}")]
    TokenAcquisition(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<CatalogError> },
}

impl CatalogError {
    /// Classify a non-success HTTP status into an error kind.
    pub fn from_status(status: u16, retry_after: Option<Duration>, message: String) -> Self {
        match status {
            401 => Self::Authentication { status, message },
            403 => Self::Authorization { status, message },
            429 => Self::RateLimited { retry_after, message },
            500..=599 => Self::Server { status, message },
            _ => Self::Client { status, message },
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } |
            Self::Authorization { status, .. } |
            Self::Server { status, .. } |
            Self::Client { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::RetriesExhausted { last, .. } => last.status_code(),
            _ => None,
        }
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Server { .. } | Self::Network { .. })
    }

    /// Server supplied retry-after hint, only present on 429 responses.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// The terminal cause, unwrapping `RetriesExhausted`.
    pub fn root_cause(&self) -> &CatalogError {
        match self {
            Self::RetriesExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Parse(err.to_string());
        }
        Self::Network { message: err.to_string(), timeout: err.is_timeout() }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
