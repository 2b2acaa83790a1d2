// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # UsagePulse Store
//!
//! State and configuration for the UsagePulse daemon.
//!
//! This crate provides:
//!
//! - **StatusStore**: The daemon status record with watch-channel notifications
//! - **DaemonConfig**: Scheduler and provider settings with persistence
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use usagepulse_store::{DaemonConfig, StatusStore};
//!
//! let config = DaemonConfig::load().await?;
//! let status = StatusStore::new();
//!
//! let mut rx = status.subscribe();
//! while rx.changed().await.is_ok() {
//!     let snapshot = status.get_status().await;
//!     println!("today: {}", snapshot.today_token_count);
//! }
//! ```

pub mod config;
pub mod error;
pub mod persistence;
pub mod status_store;

pub use config::{DaemonConfig, GeneralConfig, LogLevel, ProviderConfig};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_config_path, load_json, load_json_or_default, save_json,
};
pub use status_store::StatusStore;
