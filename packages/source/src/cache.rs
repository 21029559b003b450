//! Response cache keyed by request signature.
//!
//! A plain get-or-compute-and-store map with a fixed TTL. The map lock is
//! never held while computing, so two concurrent misses for the same key
//! both compute and the later store wins. Responses are pure functions of
//! the request, which makes that harmless.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use data_explorer_filter_models::QueryParams;
use sha2::{Digest, Sha256};

/// Default time-to-live for cached responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// In-memory response cache with a fixed TTL.
pub struct ResponseCache<V = serde_json::Value> {
    ttl: Duration,
    entries: Mutex<BTreeMap<String, Entry<V>>>,
}

impl<V: Clone> ResponseCache<V> {
    /// Creates a cache whose entries expire after `ttl`.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// The configured time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached value for `key` if it has not expired. Expired
    /// entries are removed.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.lock().insert(
            key.into(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Returns the cached value for `key`, or computes, stores and returns
    /// it on a miss.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(key) {
            log::debug!("Cache hit for {key}");
            return value;
        }

        log::debug!("Cache miss for {key}");
        let value = compute().await;
        self.set(key, value.clone());
        value
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Number of stored entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Cache key for a request: a SHA-256 hex digest over the path, the
/// parameters in key order and any extra discriminators (user id, path
/// parameter, ...).
#[must_use]
pub fn request_signature(path: &str, params: &QueryParams, discriminators: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    for (key, value) in params.iter() {
        hasher.update(b"\x1f");
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }
    for discriminator in discriminators {
        hasher.update(b"\x1e");
        hasher.update(discriminator.as_bytes());
    }
    hex::encode(hasher.finalize())
}
