use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tracing::debug;

/// Cached value with its expiration time
#[derive(Clone, Debug)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self { value, expires_at: Instant::now() + ttl }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// TTL cache keyed by request fingerprint.
///
/// Expiry is checked lazily on `get`; nothing runs in the background.
pub struct CatalogCache<T: Clone> {
    entries: DashMap<String, CacheEntry<T>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Clone> CatalogCache<T> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a live value, dropping it if it has expired
    pub fn get(&self, key: &str) -> Option<T> {
        let Some(entry) = self.entries.get(key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if entry.is_expired() {
            drop(entry);
            // Only drop it if a concurrent writer has not refreshed it meanwhile
            self.entries.remove_if(key, |_, entry| entry.is_expired());
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache entry expired");
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.value.clone())
    }

    /// Like `get`, but leaves hit/miss counters and expired entries alone
    pub fn peek(&self, key: &str) -> Option<T> {
        self.entries.get(key).filter(|entry| !entry.is_expired()).map(|entry| entry.value.clone())
    }

    /// Insert with the cache's default TTL
    pub fn set(&self, key: impl Into<String>, value: T) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert, replacing any existing entry for `key`
    pub fn set_with_ttl(&self, key: impl Into<String>, value: T, ttl: Duration) {
        let key = key.into();
        debug!(key = %key, ttl_secs = ttl.as_secs(), "Cached item");
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    pub fn invalidate(&self, key: &str) -> Option<T> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Drop every entry whose key starts with `prefix`; returns how many went
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before.saturating_sub(self.entries.len());
        debug!(prefix = %prefix, removed, "Invalidated cache scope");
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Sweep expired entries eagerly
    pub fn remove_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl std::ops::Add for CacheStats {
    type Output = CacheStats;

    fn add(self, other: CacheStats) -> CacheStats {
        CacheStats {
            size: self.size + other.size,
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
        }
    }
}
