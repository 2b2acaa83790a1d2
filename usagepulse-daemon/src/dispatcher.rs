//! Metrics dispatch.
//!
//! One cycle walks the configured providers in a fixed order (primary,
//! secondary, cloud A, cloud B), looks up today's usage for each and sends
//! one metric per facet to the sink. Providers run sequentially on the
//! caller's task.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use usagepulse_collect::{CachedCloudProvider, CachedProviderService, DEFAULT_CACHE_TTL};
use usagepulse_core::{
    validate_token_count, CloudProvider, CoreError, MetricsSink, ProviderKind, ProviderService,
    TimezoneInfo, TimezoneResolver,
};
use usagepulse_store::{DaemonConfig, StatusStore};

use crate::error::DaemonError;

/// Facet sent for the local sources.
pub const TOKENS_FACET: &str = "tokens";

/// Facets sent for each cloud provider, in send order.
pub const CLOUD_FACETS: [&str; 3] = ["input_tokens", "output_tokens", "total_tokens"];

// ============================================================================
// Dispatcher
// ============================================================================

/// Sends one round of usage metrics per call to [`MetricsDispatcher::send_cycle`].
pub struct MetricsDispatcher {
    sink: Arc<dyn MetricsSink>,
    status: Arc<StatusStore>,
    primary: Option<Arc<dyn ProviderService>>,
    secondary: Option<Arc<dyn ProviderService>>,
    cloud_a: Option<Arc<dyn CloudProvider>>,
    cloud_b: Option<Arc<dyn CloudProvider>>,
    timezone: Option<Arc<dyn TimezoneResolver>>,
    host_label: String,
    metric_prefix: String,
}

impl MetricsDispatcher {
    /// Starts building a dispatcher around a sink and a status store.
    pub fn builder(
        sink: Arc<dyn MetricsSink>,
        status: Arc<StatusStore>,
    ) -> MetricsDispatcherBuilder {
        MetricsDispatcherBuilder::new(sink, status)
    }

    /// Returns the status store this dispatcher writes to.
    pub fn status(&self) -> &Arc<StatusStore> {
        &self.status
    }

    /// Returns the host label attached to every metric.
    pub fn host_label(&self) -> &str {
        &self.host_label
    }

    /// Returns the configured providers in dispatch order.
    pub fn providers(&self) -> Vec<ProviderKind> {
        let local = [&self.primary, &self.secondary]
            .into_iter()
            .flatten()
            .map(|s| s.kind());
        let cloud = [&self.cloud_a, &self.cloud_b]
            .into_iter()
            .flatten()
            .map(|p| p.kind());
        local.chain(cloud).collect()
    }

    /// Builds `"<prefix>.<provider>.<facet>"`.
    pub fn metric_name(&self, kind: ProviderKind, facet: &str) -> String {
        format!("{}.{}.{facet}", self.metric_prefix, kind.cli_name())
    }

    /// Runs one dispatch cycle.
    ///
    /// A failing provider is logged and skipped; the remaining providers
    /// still run. The call fails only when the primary source's lookup
    /// fails. A successful primary lookup updates the status store's token
    /// count, and a sink failure while sending it is recorded there.
    /// Negative token counts are treated as lookup failures and never sent.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::PrimaryLookup`] when the primary source cannot
    /// report a valid total for today.
    #[instrument(skip(self), fields(host = %self.host_label))]
    pub async fn send_cycle(&self) -> Result<(), DaemonError> {
        let timezone = self.timezone.as_ref().map(|r| r.current_info());
        let mut outcome = Ok(());

        if let Some(primary) = &self.primary {
            let lookup = primary
                .today_aggregate()
                .await
                .and_then(|count| validate_token_count(count).map(|()| count));
            match lookup {
                Ok(count) => {
                    self.status.set_today_token_count(count).await;
                    let name = self.metric_name(primary.kind(), TOKENS_FACET);
                    if let Err(e) = self.send(count, &name, timezone.as_ref()).await {
                        warn!(
                            provider = %primary.kind(),
                            error = %e,
                            "Failed to send primary metric"
                        );
                        self.status
                            .record_error(format!("{} send failed: {e}", primary.kind()))
                            .await;
                    }
                }
                Err(e) => {
                    warn!(provider = %primary.kind(), error = %e, "Primary lookup failed");
                    outcome = Err(DaemonError::PrimaryLookup(e));
                }
            }
        }

        if let Some(secondary) = &self.secondary {
            if let Err(e) = self.send_local(secondary.as_ref(), timezone.as_ref()).await {
                warn!(provider = %secondary.kind(), error = %e, "Skipping provider this cycle");
            }
        }

        for cloud in [&self.cloud_a, &self.cloud_b].into_iter().flatten() {
            if let Err(e) = self.send_cloud(cloud.as_ref(), timezone.as_ref()).await {
                warn!(provider = %cloud.kind(), error = %e, "Skipping provider this cycle");
            }
        }

        if outcome.is_ok() {
            info!(providers = self.providers().len(), "Dispatch cycle complete");
        }
        outcome
    }

    /// Checks credentials and connectivity of every cloud provider.
    pub async fn check_connections(&self) -> Vec<(ProviderKind, Result<(), CoreError>)> {
        let mut results = Vec::new();
        for cloud in [&self.cloud_a, &self.cloud_b].into_iter().flatten() {
            let result = cloud.check_connection().await;
            match &result {
                Ok(()) => info!(provider = %cloud.kind(), "Connection OK"),
                Err(e) => warn!(provider = %cloud.kind(), error = %e, "Connection check failed"),
            }
            results.push((cloud.kind(), result));
        }
        results
    }

    async fn send_local(
        &self,
        service: &dyn ProviderService,
        timezone: Option<&TimezoneInfo>,
    ) -> Result<(), CoreError> {
        let count = service.today_aggregate().await?;
        validate_token_count(count)?;
        let name = self.metric_name(service.kind(), TOKENS_FACET);
        self.send(count, &name, timezone).await
    }

    async fn send_cloud(
        &self,
        provider: &dyn CloudProvider,
        timezone: Option<&TimezoneInfo>,
    ) -> Result<(), CoreError> {
        let date = today(timezone);
        let snapshot = provider.daily_usage(date).await?;
        snapshot.validate()?;

        let values = [
            snapshot.input_tokens,
            snapshot.output_tokens,
            snapshot.total_tokens(),
        ];
        for (facet, value) in CLOUD_FACETS.iter().zip(values) {
            let name = self.metric_name(provider.kind(), facet);
            self.send(value, &name, timezone).await?;
        }
        debug!(provider = %provider.kind(), date = %date, "Cloud usage sent");
        Ok(())
    }

    async fn send(
        &self,
        value: i64,
        metric_name: &str,
        timezone: Option<&TimezoneInfo>,
    ) -> Result<(), CoreError> {
        match timezone {
            Some(tz) => {
                self.sink
                    .send_with_timezone(value, &self.host_label, metric_name, tz)
                    .await
            }
            None => self.sink.send(value, &self.host_label, metric_name).await,
        }
    }
}

impl std::fmt::Debug for MetricsDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsDispatcher")
            .field("providers", &self.providers())
            .field("host_label", &self.host_label)
            .field("metric_prefix", &self.metric_prefix)
            .field("timezone_aware", &self.timezone.is_some())
            .finish_non_exhaustive()
    }
}

fn today(timezone: Option<&TimezoneInfo>) -> NaiveDate {
    match timezone {
        Some(tz) => tz.date_of(Utc::now()),
        None => Local::now().date_naive(),
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`MetricsDispatcher`].
pub struct MetricsDispatcherBuilder {
    sink: Arc<dyn MetricsSink>,
    status: Arc<StatusStore>,
    primary: Option<Arc<dyn ProviderService>>,
    secondary: Option<Arc<dyn ProviderService>>,
    cloud_a: Option<Arc<dyn CloudProvider>>,
    cloud_b: Option<Arc<dyn CloudProvider>>,
    timezone: Option<Arc<dyn TimezoneResolver>>,
    host_label: String,
    metric_prefix: String,
    cache_ttl: Option<Duration>,
    enabled: Option<BTreeSet<ProviderKind>>,
}

impl MetricsDispatcherBuilder {
    fn new(sink: Arc<dyn MetricsSink>, status: Arc<StatusStore>) -> Self {
        let defaults = DaemonConfig::default();
        Self {
            sink,
            status,
            primary: None,
            secondary: None,
            cloud_a: None,
            cloud_b: None,
            timezone: None,
            host_label: defaults.general.host_label,
            metric_prefix: defaults.general.metric_prefix,
            cache_ttl: Some(DEFAULT_CACHE_TTL),
            enabled: None,
        }
    }

    /// Applies host label, metric prefix, cache TTL and the enabled set.
    pub fn config(mut self, config: &DaemonConfig) -> Self {
        self.host_label.clone_from(&config.general.host_label);
        self.metric_prefix.clone_from(&config.general.metric_prefix);
        self.cache_ttl = Some(config.cache_ttl());
        self.enabled = Some(config.enabled_providers().into_iter().collect());
        self
    }

    /// Sets the primary usage source.
    pub fn primary(mut self, service: Arc<dyn ProviderService>) -> Self {
        self.primary = Some(service);
        self
    }

    /// Sets the secondary usage source.
    pub fn secondary(mut self, service: Arc<dyn ProviderService>) -> Self {
        self.secondary = Some(service);
        self
    }

    /// Sets cloud provider A.
    pub fn cloud_a(mut self, provider: Arc<dyn CloudProvider>) -> Self {
        self.cloud_a = Some(provider);
        self
    }

    /// Sets cloud provider B.
    pub fn cloud_b(mut self, provider: Arc<dyn CloudProvider>) -> Self {
        self.cloud_b = Some(provider);
        self
    }

    /// Makes sink calls timezone-aware.
    pub fn timezone_resolver(mut self, resolver: Arc<dyn TimezoneResolver>) -> Self {
        self.timezone = Some(resolver);
        self
    }

    /// Sets the host label.
    pub fn host_label(mut self, label: impl Into<String>) -> Self {
        self.host_label = label.into();
        self
    }

    /// Sets the metric name prefix.
    pub fn metric_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metric_prefix = prefix.into();
        self
    }

    /// Sets the TTL of the caches in front of the secondary source and both
    /// cloud providers. Defaults to [`DEFAULT_CACHE_TTL`].
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Queries every provider on every cycle.
    pub fn without_cache(mut self) -> Self {
        self.cache_ttl = None;
        self
    }

    /// Builds the dispatcher.
    ///
    /// Providers whose kind is disabled in the applied configuration are
    /// dropped. Unless [`without_cache`](Self::without_cache) was called, the
    /// secondary source and the cloud providers are wrapped in read-through
    /// caches.
    pub fn build(self) -> MetricsDispatcher {
        let enabled = self.enabled;
        let is_enabled =
            |kind: ProviderKind| enabled.as_ref().is_none_or(|set| set.contains(&kind));
        let ttl = self.cache_ttl;

        let primary = self.primary.filter(|s| is_enabled(s.kind()));
        let secondary = self
            .secondary
            .filter(|s| is_enabled(s.kind()))
            .map(|s| match ttl {
                Some(ttl) => {
                    Arc::new(CachedProviderService::with_ttl(s, ttl)) as Arc<dyn ProviderService>
                }
                None => s,
            });
        let wrap_cloud = |p: Arc<dyn CloudProvider>| match ttl {
            Some(ttl) => Arc::new(CachedCloudProvider::with_ttl(p, ttl)) as Arc<dyn CloudProvider>,
            None => p,
        };
        let cloud_a = self.cloud_a.filter(|p| is_enabled(p.kind())).map(wrap_cloud);
        let cloud_b = self.cloud_b.filter(|p| is_enabled(p.kind())).map(wrap_cloud);

        let dispatcher = MetricsDispatcher {
            sink: self.sink,
            status: self.status,
            primary,
            secondary,
            cloud_a,
            cloud_b,
            timezone: self.timezone,
            host_label: self.host_label,
            metric_prefix: self.metric_prefix,
        };
        debug!(dispatcher = ?dispatcher, "Built metrics dispatcher");
        dispatcher
    }
}

// ============================================================================
// Tests
// ============================================================================
