// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # UsagePulse Daemon
//!
//! Scheduling and dispatch for the UsagePulse daemon.
//!
//! - [`MetricsDispatcher`] - One sequential pass over the enabled providers
//! - [`DaemonScheduler`] - Interval loop with pause, wake catch-up and triggers
//! - [`history::collect_merged`] - Concurrent historical collection, merged per day
//! - [`logging::init_logging`] - Subscriber bootstrap
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use usagepulse_daemon::{DaemonScheduler, MetricsDispatcher};
//! use usagepulse_store::{DaemonConfig, StatusStore};
//!
//! let config = DaemonConfig::load().await?;
//! usagepulse_daemon::logging::init_logging(config.general.log_level);
//!
//! let dispatcher = MetricsDispatcher::builder(sink, Arc::new(StatusStore::new()))
//!     .primary(claude_logs)
//!     .secondary(cursor_db)
//!     .cloud_a(bedrock)
//!     .config(&config)
//!     .build();
//!
//! let scheduler = DaemonScheduler::new(Arc::new(dispatcher), config);
//! scheduler.start().await?;
//! ```

pub mod dispatcher;
pub mod error;
pub mod history;
pub mod logging;
pub mod scheduler;
pub mod signals;

pub use dispatcher::{MetricsDispatcher, MetricsDispatcherBuilder, CLOUD_FACETS, TOKENS_FACET};
pub use error::DaemonError;
pub use history::{build_collector, collect_merged};
pub use scheduler::{
    CycleTrigger, DaemonScheduler, LifecycleState, ScheduleState, SchedulerEvent, SLEEPING_MESSAGE,
};
