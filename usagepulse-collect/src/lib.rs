// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # UsagePulse Collect
//!
//! Caching and concurrent collection for the UsagePulse daemon.
//!
//! ## Caching
//!
//! - [`cache::UsageCache`] - Read-through cache with one expiry shared by all keys
//! - [`cached::CachedCloudProvider`] - Cloud provider decorator backed by a cache
//! - [`cached::CachedProviderService`] - Local provider decorator backed by a cache
//!
//! ## Historical Collection
//!
//! - [`collector::ConcurrentCollector`] - One task per metric type, joined
//! - [`merge::SourceMerger`] - `(timestamp, host)` merge of several sources
//!
//! ## Example
//!
//! ```ignore
//! use usagepulse_collect::{CachedCloudProvider, ConcurrentCollector};
//!
//! let bedrock = CachedCloudProvider::new(BedrockClient::new("us-east-1"));
//! let snapshot = bedrock.daily_usage(today).await?;
//!
//! let collector = ConcurrentCollector::with_adapters(adapters);
//! let records = collector.collect(start, end, &["all"]).await?;
//! ```

pub mod cache;
pub mod cached;
pub mod collector;
pub mod error;
pub mod merge;

pub use cache::{CacheValue, UsageCache, DEFAULT_CACHE_TTL};
pub use cached::{CachedCloudProvider, CachedProviderService};
pub use collector::{ConcurrentCollector, PartialFailurePolicy, DEFAULT_PARTIAL_FAILURE_POLICY};
pub use error::{CollectError, TaskFailure};
pub use merge::{MergedRow, SourceMerger};
