// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `UsagePulse` Core
//!
//! Core types, models, and traits for the `UsagePulse` daemon.
//!
//! This crate provides the foundational abstractions used across all other
//! `UsagePulse` crates:
//!
//! - Domain models (providers, usage snapshots, metric records, status)
//! - The [`CoreError`] type
//! - Collaborator traits implemented by provider clients and sinks
//!
//! ## Key Types
//!
//! ### Usage Types
//! - [`UsageSnapshot`] - Aggregate usage for one provider/key/time window
//! - [`ModelMetric`] - Per-model slice of a snapshot
//! - [`MetricRecord`] - One exported data point
//!
//! ### Status
//! - [`DaemonStatus`] - What the UI layer polls
//! - [`TimezoneInfo`] - Timezone metadata for sink calls
//!
//! ### Collaborators
//! - [`ProviderService`] - Local sources reporting today's tokens
//! - [`CloudProvider`] - Cloud usage-metering APIs
//! - [`MetricsSink`] - Where metric values go
//! - [`TimezoneResolver`] - Optional timezone capability
//! - [`CollectorAdapter`] - Historical collection for one metric type

pub mod error;
pub mod models;
pub mod traits;

pub use error::CoreError;

pub use models::{
    parse_metric_types, sort_records_by_timestamp, DaemonStatus, MetricRecord, ModelMetric,
    validate_token_count, ProviderKind, ProviderRole, TimezoneInfo, UsageSnapshot,
    ALL_METRIC_TYPES,
};

pub use traits::{CloudProvider, CollectorAdapter, MetricsSink, ProviderService, TimezoneResolver};
