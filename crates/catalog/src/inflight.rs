use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{CatalogError, Result};

/// Awaitable handle onto a fetch that may have several waiters
pub type PendingFetch<T> = Shared<BoxFuture<'static, Result<T>>>;

/// Outcome of [`InFlight::join_or_start`]
pub enum Joined<T: Clone> {
    /// The value was already available
    Ready(T),
    /// Await this to get the shared result
    Pending(PendingFetch<T>),
}

struct Entry<T: Clone> {
    id: u64,
    fetch: PendingFetch<T>,
}

/// Tracks at most one running fetch per cache key.
///
/// Fetches run on their own task, so a waiter giving up does not cancel the
/// request other waiters (or the cache) still depend on. A detached fetch
/// still resolves its waiters but no longer commits its result.
pub struct InFlight<T: Clone> {
    pending: Arc<Mutex<HashMap<String, Entry<T>>>>,
    next_id: AtomicU64,
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self { pending: Arc::new(Mutex::new(HashMap::new())), next_id: AtomicU64::new(0) }
    }

    /// Attach to the fetch running for `key`, or start `fetch` if none is.
    ///
    /// `lookup` runs under the same lock as the registry, so a fetch that has
    /// already settled (and committed its result) is picked up instead of
    /// being repeated. `commit` receives a successful result under that lock,
    /// and only while the fetch is still registered for `key`.
    pub fn join_or_start<L, F, C>(&self, key: &str, lookup: L, fetch: F, commit: C) -> Joined<T>
    where
        L: FnOnce() -> Option<T>,
        F: Future<Output = Result<T>> + Send + 'static,
        C: FnOnce(&T) + Send + 'static,
    {
        let mut pending = self.pending.lock();

        if let Some(existing) = pending.get(key) {
            debug!(key = %key, "Joining in-flight fetch");
            return Joined::Pending(existing.fetch.clone());
        }

        if let Some(value) = lookup() {
            return Joined::Ready(value);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = self.pending.clone();
        let owned_key = key.to_string();
        let task = tokio::spawn(async move {
            let result = fetch.await;

            let mut pending = registry.lock();
            if pending.get(&owned_key).is_some_and(|entry| entry.id == id) {
                pending.remove(&owned_key);
                if let Ok(value) = &result {
                    commit(value);
                }
            } else {
                debug!(key = %owned_key, "Fetch settled after being detached, result not kept");
            }
            result
        });

        let shared = async move {
            task.await
                .unwrap_or_else(|e| Err(CatalogError::Internal(format!("fetch task failed: {e}"))))
        }
        .boxed()
        .shared();

        pending.insert(key.to_string(), Entry { id, fetch: shared.clone() });
        Joined::Pending(shared)
    }

    /// Forget running fetches whose key starts with `prefix`.
    ///
    /// Their waiters still get a result, but later callers start afresh and
    /// the detached fetches never commit. Returns how many were detached.
    pub fn detach_prefix(&self, prefix: &str) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|key, _| !key.starts_with(prefix));
        before - pending.len()
    }

    /// Forget every running fetch
    pub fn detach_all(&self) -> usize {
        let mut pending = self.pending.lock();
        let detached = pending.len();
        pending.clear();
        detached
    }

    /// Number of fetches currently running
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
