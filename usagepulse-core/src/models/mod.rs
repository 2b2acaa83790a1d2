//! Domain models for UsagePulse.
//!
//! ## Submodules
//!
//! - [`provider`] - Provider types (ProviderKind, ProviderRole)
//! - [`usage`] - Usage types (UsageSnapshot, ModelMetric)
//! - [`metric`] - Exported records (MetricRecord) and metric-type parsing
//! - [`status`] - Daemon status and timezone metadata

mod metric;
mod provider;
mod status;
mod usage;

pub use metric::{parse_metric_types, sort_records_by_timestamp, MetricRecord, ALL_METRIC_TYPES};
pub use provider::{ProviderKind, ProviderRole};
pub use status::{DaemonStatus, TimezoneInfo};
pub use usage::{validate_token_count, ModelMetric, UsageSnapshot};
#[cfg(test)]
mod serde_tests;
