//! Cache-backed provider decorators.
//!
//! [`CachedCloudProvider`] and [`CachedProviderService`] wrap a slow provider
//! client and answer repeat lookups from a [`UsageCache`] until its shared
//! expiry passes. They implement the same trait as the client they wrap, so
//! the dispatcher cannot tell a cached provider from a live one.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::time::Duration;
use tracing::instrument;
use usagepulse_core::{CloudProvider, CoreError, ProviderKind, ProviderService, UsageSnapshot};

use crate::cache::UsageCache;

// ============================================================================
// Cloud Provider
// ============================================================================

/// A [`CloudProvider`] answered from a [`UsageCache`].
///
/// Entries are keyed by `"<provider key>|<date>"` so that a historical day
/// never shadows today's snapshot.
pub struct CachedCloudProvider<P> {
    inner: P,
    cache: UsageCache<UsageSnapshot>,
}

impl<P: CloudProvider> CachedCloudProvider<P> {
    /// Wraps a provider with a default-TTL cache.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: UsageCache::new(),
        }
    }

    /// Wraps a provider with a custom TTL.
    pub fn with_ttl(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            cache: UsageCache::with_ttl(ttl),
        }
    }

    /// Returns the underlying cache.
    pub fn cache(&self) -> &UsageCache<UsageSnapshot> {
        &self.cache
    }

    /// Returns the wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn cache_key(&self, date: NaiveDate) -> String {
        format!("{}|{date}", self.inner.key())
    }
}

#[async_trait]
impl<P: CloudProvider> CloudProvider for CachedCloudProvider<P> {
    fn kind(&self) -> ProviderKind {
        self.inner.kind()
    }

    fn key(&self) -> String {
        self.inner.key()
    }

    #[instrument(skip(self), fields(provider = %self.inner.kind()))]
    async fn daily_usage(&self, date: NaiveDate) -> Result<UsageSnapshot, CoreError> {
        let key = self.cache_key(date);
        self.cache
            .get_or_fetch(&key, || self.inner.daily_usage(date))
            .await
    }

    async fn check_connection(&self) -> Result<(), CoreError> {
        self.inner.check_connection().await
    }
}

// ============================================================================
// Provider Service
// ============================================================================

/// A [`ProviderService`] answered from a [`UsageCache`].
///
/// Used for the IDE usage database, whose reads are comparatively slow.
/// The cache key carries the local date so the count resets at midnight.
pub struct CachedProviderService<S> {
    inner: S,
    cache: UsageCache<i64>,
}

impl<S: ProviderService> CachedProviderService<S> {
    /// Wraps a service with a default-TTL cache.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: UsageCache::new(),
        }
    }

    /// Wraps a service with a custom TTL.
    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: UsageCache::with_ttl(ttl),
        }
    }

    /// Returns the underlying cache.
    pub fn cache(&self) -> &UsageCache<i64> {
        &self.cache
    }
}

#[async_trait]
impl<S: ProviderService> ProviderService for CachedProviderService<S> {
    fn kind(&self) -> ProviderKind {
        self.inner.kind()
    }

    async fn today_aggregate(&self) -> Result<i64, CoreError> {
        let key = format!("today|{}", Local::now().date_naive());
        self.cache
            .get_or_fetch(&key, || self.inner.today_aggregate())
            .await
    }
}
