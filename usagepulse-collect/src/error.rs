//! Collection error types.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use usagepulse_core::{CoreError, ProviderKind};

// ============================================================================
// Task Failure
// ============================================================================

/// One failed collection task, tagged with its metric type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// The metric type whose adapter failed.
    pub kind: ProviderKind,
    /// Error message from the adapter or the task runtime.
    pub error: String,
}

impl TaskFailure {
    /// Creates a failure record.
    pub fn new(kind: ProviderKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            error: error.into(),
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.cli_name(), self.error)
    }
}

fn join_failures(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Collect Error
// ============================================================================

/// Error type for collection operations.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The request named a metric type outside the allow-set.
    #[error("Invalid metric types: {0}")]
    InvalidMetricTypes(String),

    /// The time range is inverted.
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange {
        /// Requested start.
        start: DateTime<Utc>,
        /// Requested end.
        end: DateTime<Utc>,
    },

    /// Every requested metric type failed.
    #[error("All {} metric types failed: {}", .failures.len(), join_failures(.failures))]
    AllFailed {
        /// One entry per requested type.
        failures: Vec<TaskFailure>,
    },

    /// Some metric types failed under the strict policy.
    #[error("{} of {requested} metric types failed: {}", .failures.len(), join_failures(.failures))]
    PartialFailure {
        /// Number of types requested.
        requested: usize,
        /// The failed types.
        failures: Vec<TaskFailure>,
    },

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl CollectError {
    /// Returns the per-type failures carried by this error.
    pub fn failures(&self) -> &[TaskFailure] {
        match self {
            Self::AllFailed { failures } | Self::PartialFailure { failures, .. } => failures,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failed_message_lists_types() {
        let err = CollectError::AllFailed {
            failures: vec![
                TaskFailure::new(ProviderKind::Bedrock, "throttled"),
                TaskFailure::new(ProviderKind::VertexAi, "no project"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("All 2 metric types failed"));
        assert!(msg.contains("bedrock: throttled"));
        assert!(msg.contains("vertex_ai: no project"));
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn test_invalid_types_has_no_failures() {
        let err = CollectError::InvalidMetricTypes("openai".to_string());
        assert!(err.failures().is_empty());
    }
}
