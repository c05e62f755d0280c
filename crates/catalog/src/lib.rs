pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod inflight;
pub mod infrastructure;
pub mod metrics;
pub mod request;
pub mod retry;
pub mod token;
pub mod types;
pub mod version;

// Re-export the main entry points
pub use client::CatalogClient;
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use token::{EnvTokenSupplier, StaticTokenSupplier, TokenSupplier};
pub use types::{Offer, Publisher, Sku};
