//! Daemon error types.

use thiserror::Error;
use usagepulse_collect::CollectError;
use usagepulse_core::CoreError;
use usagepulse_store::StoreError;

/// Errors raised by the dispatcher and the scheduler.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Invalid scheduler configuration. Fatal to `start`.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `start` was called on a scheduler that is not stopped.
    #[error("Scheduler is already running")]
    AlreadyRunning,

    /// An input was sent to a scheduler whose loop is not running.
    #[error("Scheduler is not running")]
    NotRunning,

    /// The primary source lookup failed.
    #[error("Primary source lookup failed: {0}")]
    PrimaryLookup(#[source] CoreError),

    /// Core error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Historical collection error.
    #[error(transparent)]
    Collect(#[from] CollectError),

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DaemonError {
    /// Returns true if this error comes from configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            DaemonError::Config(_) | DaemonError::Store(StoreError::Config(_))
        )
    }
}
