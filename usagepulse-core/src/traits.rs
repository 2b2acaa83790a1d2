//! Collaborator traits.
//!
//! The daemon never talks to a log store, a database or a cloud API itself.
//! Concrete clients implement these traits and are injected at construction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use crate::error::CoreError;
use crate::models::{MetricRecord, ProviderKind, TimezoneInfo, UsageSnapshot};

/// A local usage source that reports today's token total.
///
/// Implemented by the coding-assistant log reader (primary) and the IDE
/// usage database reader (secondary).
#[async_trait]
pub trait ProviderService: Send + Sync {
    /// Returns the kind of provider this service handles.
    fn kind(&self) -> ProviderKind;

    /// Returns today's aggregate token count.
    async fn today_aggregate(&self) -> Result<i64, CoreError>;
}

/// A cloud usage-metering API.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the kind of provider this client handles.
    fn kind(&self) -> ProviderKind;

    /// Returns the region or `projectID:location` this client is bound to.
    fn key(&self) -> String;

    /// Fetches the usage snapshot for one calendar day.
    async fn daily_usage(&self, date: NaiveDate) -> Result<UsageSnapshot, CoreError>;

    /// Verifies that credentials and connectivity are in order.
    async fn check_connection(&self) -> Result<(), CoreError>;
}

/// Destination for named metric values.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Sends one metric value without timezone metadata.
    async fn send(&self, value: i64, host_label: &str, metric_name: &str) -> Result<(), CoreError>;

    /// Sends one metric value with timezone metadata.
    ///
    /// Sinks that have no use for the timezone can rely on the default,
    /// which drops it and calls [`MetricsSink::send`].
    async fn send_with_timezone(
        &self,
        value: i64,
        host_label: &str,
        metric_name: &str,
        timezone: &TimezoneInfo,
    ) -> Result<(), CoreError> {
        let _ = timezone;
        self.send(value, host_label, metric_name).await
    }
}

// ============================================================================
// Shared Handles
// ============================================================================

#[async_trait]
impl<T: ProviderService + ?Sized> ProviderService for Arc<T> {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    async fn today_aggregate(&self) -> Result<i64, CoreError> {
        (**self).today_aggregate().await
    }
}

#[async_trait]
impl<T: CloudProvider + ?Sized> CloudProvider for Arc<T> {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    fn key(&self) -> String {
        (**self).key()
    }

    async fn daily_usage(&self, date: NaiveDate) -> Result<UsageSnapshot, CoreError> {
        (**self).daily_usage(date).await
    }

    async fn check_connection(&self) -> Result<(), CoreError> {
        (**self).check_connection().await
    }
}

/// Optional capability resolving the timezone to report in.
pub trait TimezoneResolver: Send + Sync {
    /// Returns the current timezone.
    fn current_info(&self) -> TimezoneInfo;
}

/// A fixed timezone resolves to itself.
impl TimezoneResolver for TimezoneInfo {
    fn current_info(&self) -> TimezoneInfo {
        self.clone()
    }
}

/// Historical collection for one metric type.
#[async_trait]
pub trait CollectorAdapter: Send + Sync {
    /// Returns the metric type this adapter serves.
    fn kind(&self) -> ProviderKind;

    /// Collects records for the inclusive range `[start, end]`.
    async fn collect(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricRecord>, CoreError>;
}
