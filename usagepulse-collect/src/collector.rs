//! Concurrent historical collection.
//!
//! The [`ConcurrentCollector`] fans a `[start, end]` request out to one task
//! per requested metric type, waits for every task to finish, and merges the
//! successful record lists. Failures are logged per type; whether a partial
//! failure surfaces as an error is decided by [`PartialFailurePolicy`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};
use usagepulse_core::{parse_metric_types, CollectorAdapter, CoreError, MetricRecord, ProviderKind};

use crate::error::{CollectError, TaskFailure};

// ============================================================================
// Partial Failure Policy
// ============================================================================

/// What [`ConcurrentCollector::collect`] reports when some types fail.
///
/// All types failing is always an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialFailurePolicy {
    /// Return whatever succeeded without an error. Callers detect partial
    /// loss from record counts and logs only.
    #[default]
    BestEffort,
    /// Any failed type turns the whole call into an error.
    Strict,
}

/// Policy used by a collector unless overridden.
pub const DEFAULT_PARTIAL_FAILURE_POLICY: PartialFailurePolicy = PartialFailurePolicy::BestEffort;

// ============================================================================
// Concurrent Collector
// ============================================================================

/// Fans a collection request out across metric-type adapters.
pub struct ConcurrentCollector {
    adapters: HashMap<ProviderKind, Arc<dyn CollectorAdapter>>,
    task_timeout: Option<Duration>,
    policy: PartialFailurePolicy,
}

impl ConcurrentCollector {
    /// Creates a collector with no adapters.
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            task_timeout: None,
            policy: DEFAULT_PARTIAL_FAILURE_POLICY,
        }
    }

    /// Creates a collector with the given adapters.
    ///
    /// A later adapter for the same metric type replaces an earlier one.
    pub fn with_adapters(adapters: Vec<Arc<dyn CollectorAdapter>>) -> Self {
        let mut collector = Self::new();
        for adapter in adapters {
            collector.register(adapter);
        }
        collector
    }

    /// Registers an adapter under its metric type.
    pub fn register(&mut self, adapter: Arc<dyn CollectorAdapter>) {
        let kind = adapter.kind();
        if self.adapters.insert(kind, adapter).is_some() {
            debug!(kind = %kind.cli_name(), "Replaced collector adapter");
        }
    }

    /// Bounds every adapter call by `timeout`.
    ///
    /// Without this a hung adapter hangs the whole `collect` call.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    /// Sets the partial failure policy.
    pub fn with_policy(mut self, policy: PartialFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the partial failure policy.
    pub fn policy(&self) -> PartialFailurePolicy {
        self.policy
    }

    /// Returns the per-task timeout, if any.
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout
    }

    /// Returns the metric types that have an adapter.
    pub fn registered_types(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.adapters.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Collects records for `[start, end]` across the requested metric types.
    ///
    /// An empty `metric_types` list, or one containing `"all"`, requests
    /// every type. One task is spawned per type and all of them are awaited;
    /// there is no early cancellation. Records come back in no particular
    /// order.
    ///
    /// # Errors
    ///
    /// - [`CollectError::InvalidMetricTypes`] for a name outside the allow-set
    /// - [`CollectError::InvalidRange`] when `start > end`
    /// - [`CollectError::AllFailed`] when every requested type failed
    /// - [`CollectError::PartialFailure`] when some failed under
    ///   [`PartialFailurePolicy::Strict`]
    #[instrument(skip(self, metric_types), fields(start = %start, end = %end))]
    pub async fn collect<S: AsRef<str>>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        metric_types: &[S],
    ) -> Result<Vec<MetricRecord>, CollectError> {
        let kinds = parse_metric_types(metric_types)
            .map_err(|e| CollectError::InvalidMetricTypes(e.to_string()))?;
        if start > end {
            return Err(CollectError::InvalidRange { start, end });
        }

        let started = Instant::now();
        info!(types = kinds.len(), "Starting concurrent collection");

        let tasks = kinds.iter().map(|&kind| {
            let adapter = self.adapters.get(&kind).cloned();
            let timeout = self.task_timeout;
            let handle = tokio::spawn(run_adapter(kind, adapter, start, end, timeout));
            async move { (kind, handle.await) }
        });
        let outcomes = join_all(tasks).await;

        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (kind, outcome) in outcomes {
            match outcome {
                Ok(Ok(batch)) => {
                    debug!(
                        kind = %kind.cli_name(),
                        records = batch.len(),
                        "Collection task succeeded"
                    );
                    records.extend(batch);
                }
                Ok(Err(error)) => {
                    warn!(kind = %kind.cli_name(), error = %error, "Collection task failed");
                    failures.push(TaskFailure::new(kind, error.to_string()));
                }
                Err(join_error) => {
                    warn!(kind = %kind.cli_name(), error = %join_error, "Collection task aborted");
                    failures.push(TaskFailure::new(kind, format!("task aborted: {join_error}")));
                }
            }
        }

        info!(
            records = records.len(),
            failed = failures.len(),
            duration = ?started.elapsed(),
            "Concurrent collection finished"
        );

        if failures.len() == kinds.len() {
            return Err(CollectError::AllFailed { failures });
        }
        if !failures.is_empty() && self.policy == PartialFailurePolicy::Strict {
            return Err(CollectError::PartialFailure {
                requested: kinds.len(),
                failures,
            });
        }
        Ok(records)
    }
}

impl Default for ConcurrentCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConcurrentCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentCollector")
            .field("types", &self.registered_types())
            .field("task_timeout", &self.task_timeout)
            .field("policy", &self.policy)
            .finish()
    }
}

async fn run_adapter(
    kind: ProviderKind,
    adapter: Option<Arc<dyn CollectorAdapter>>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    timeout: Option<Duration>,
) -> Result<Vec<MetricRecord>, CoreError> {
    let Some(adapter) = adapter else {
        return Err(CoreError::provider(kind, "no collector adapter registered"));
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, adapter.collect(start, end))
            .await
            .map_err(|_| CoreError::provider(kind, format!("timed out after {limit:?}")))?,
        None => adapter.collect(start, end).await,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FixedAdapter {
        kind: ProviderKind,
        count: usize,
    }

    #[async_trait]
    impl CollectorAdapter for FixedAdapter {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn collect(
            &self,
            start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<MetricRecord>, CoreError> {
            Ok((0..self.count)
                .map(|i| {
                    MetricRecord::new(start, self.kind.cli_name(), "host1", i as f64, "tokens")
                })
                .collect())
        }
    }

    struct FailingAdapter(ProviderKind);

    #[async_trait]
    impl CollectorAdapter for FailingAdapter {
        fn kind(&self) -> ProviderKind {
            self.0
        }

        async fn collect(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<MetricRecord>, CoreError> {
            Err(CoreError::provider(self.0, "boom"))
        }
    }

    fn range() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 4, 7, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_default_policy_is_best_effort() {
        assert_eq!(DEFAULT_PARTIAL_FAILURE_POLICY, PartialFailurePolicy::BestEffort);
        assert_eq!(ConcurrentCollector::new().policy(), PartialFailurePolicy::BestEffort);
        assert!(ConcurrentCollector::new().task_timeout().is_none());
    }

    #[tokio::test]
    async fn test_register_replaces_same_kind() {
        let collector = ConcurrentCollector::with_adapters(vec![
            Arc::new(FixedAdapter {
                kind: ProviderKind::Cursor,
                count: 1,
            }),
            Arc::new(FixedAdapter {
                kind: ProviderKind::Cursor,
                count: 3,
            }),
        ]);
        let (start, end) = range();
        let records = collector.collect(start, end, &["cursor"]).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(collector.registered_types(), vec![ProviderKind::Cursor]);
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let collector = ConcurrentCollector::new();
        let (start, end) = range();
        let err = collector.collect(end, start, &["all"]).await.unwrap_err();
        assert!(matches!(err, CollectError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn test_unknown_type_rejected_before_spawning() {
        let collector = ConcurrentCollector::with_adapters(vec![Arc::new(FixedAdapter {
            kind: ProviderKind::Bedrock,
            count: 1,
        })]);
        let (start, end) = range();
        let err = collector.collect(start, end, &["bedrock", "azure"]).await.unwrap_err();
        assert!(matches!(err, CollectError::InvalidMetricTypes(_)));
    }

    #[tokio::test]
    async fn test_strict_policy_reports_partial_failure() {
        let collector = ConcurrentCollector::with_adapters(vec![
            Arc::new(FixedAdapter {
                kind: ProviderKind::Bedrock,
                count: 2,
            }),
            Arc::new(FailingAdapter(ProviderKind::VertexAi)),
        ])
        .with_policy(PartialFailurePolicy::Strict);
        let (start, end) = range();
        let err = collector
            .collect(start, end, &["bedrock", "vertex_ai"])
            .await
            .unwrap_err();
        match err {
            CollectError::PartialFailure { requested, failures } => {
                assert_eq!(requested, 2);
                assert_eq!(
                    failures,
                    vec![TaskFailure::new(
                        ProviderKind::VertexAi,
                        "Vertex AI provider error: boom"
                    )]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_adapter_counts_as_failure() {
        let collector = ConcurrentCollector::with_adapters(vec![Arc::new(FixedAdapter {
            kind: ProviderKind::ClaudeCode,
            count: 4,
        })]);
        let (start, end) = range();
        let records = collector.collect(start, end, &["primary", "secondary"]).await.unwrap();
        assert_eq!(records.len(), 4);

        let err = collector.collect(start, end, &["secondary"]).await.unwrap_err();
        assert_eq!(err.failures()[0].kind, ProviderKind::Cursor);
        assert!(err.failures()[0].error.contains("no collector adapter"));
    }
}
