//! Read-through usage cache.
//!
//! A [`UsageCache`] sits in front of a slow provider call. Entries live in a
//! map guarded by one read/write lock, and a single expiry instant governs
//! every key in the cache: storing any key pushes the expiry out for all of
//! them. The cache is time-bounded only; the key space (regions, projects)
//! is small and operator-controlled, so there is no size-based eviction.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};
use usagepulse_core::{validate_token_count, CoreError, UsageSnapshot};

/// Default time-to-live for cached values.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

// ============================================================================
// Cache Value
// ============================================================================

/// Values that can be stored in a [`UsageCache`].
///
/// A value that fails validation is never cached or returned.
pub trait CacheValue: Clone + Send + Sync {
    /// Checks the value before it is stored.
    fn validate(&self) -> Result<(), CoreError>;
}

impl CacheValue for UsageSnapshot {
    fn validate(&self) -> Result<(), CoreError> {
        UsageSnapshot::validate(self)
    }
}

/// Plain token counts, as reported by the local providers.
impl CacheValue for i64 {
    fn validate(&self) -> Result<(), CoreError> {
        validate_token_count(*self)
    }
}

// ============================================================================
// Usage Cache
// ============================================================================

struct CacheInner<V> {
    entries: HashMap<String, V>,
    expiry: Option<Instant>,
    ttl: Duration,
}

impl<V> CacheInner<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expiry.is_none_or(|expiry| now >= expiry)
    }
}

/// Time-bounded read-through cache with one expiry shared by all keys.
pub struct UsageCache<V = UsageSnapshot> {
    inner: RwLock<CacheInner<V>>,
}

impl<V: CacheValue> UsageCache<V> {
    /// Creates an empty cache with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    /// Creates an empty cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                expiry: None,
                ttl,
            }),
        }
    }

    /// Returns the cached value for `key`, or fetches and stores a fresh one.
    ///
    /// The fetch runs outside any lock, so concurrent misses for the same key
    /// may each call the provider; the last writer wins.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error, or `CoreError::InvalidData` when the fetched
    /// value fails validation. Nothing is cached in either case.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<V, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, CoreError>>,
    {
        {
            let inner = self.inner.read().await;
            if !inner.is_expired(Instant::now()) {
                if let Some(value) = inner.entries.get(key) {
                    trace!(key, "Cache hit");
                    return Ok(value.clone());
                }
            }
        }

        debug!(key, "Cache miss, fetching");
        let value = fetch().await?;
        value.validate()?;

        let mut inner = self.inner.write().await;
        inner.expiry = Some(Instant::now() + inner.ttl);
        inner.entries.insert(key.to_string(), value.clone());
        Ok(value)
    }

    /// Drops every entry and resets the expiry.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.expiry = None;
        debug!("Cache cleared");
    }

    /// Changes the TTL used for subsequent stores.
    ///
    /// The current expiry is left alone.
    pub async fn set_ttl(&self, ttl: Duration) {
        self.inner.write().await.ttl = ttl;
    }

    /// Returns the configured TTL.
    pub async fn ttl(&self) -> Duration {
        self.inner.read().await.ttl
    }

    /// Returns true once the shared expiry has passed (or nothing was stored).
    pub async fn is_expired(&self) -> bool {
        self.inner.read().await.is_expired(Instant::now())
    }

    /// Returns the number of stored keys, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Returns true if no keys are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

impl<V: CacheValue> Default for UsageCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for UsageCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageCache").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
