pub mod error;
pub use error::Error;

pub mod rate_limiter;
pub use rate_limiter::RateLimiter;

pub mod http_client;
pub use http_client::HttpClientFactory;

pub mod utils;
pub use utils::{parse_and_validate_url, parse_retry_after};
