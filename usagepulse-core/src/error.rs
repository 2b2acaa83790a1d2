//! Core error types for `UsagePulse`.

use thiserror::Error;

use crate::models::ProviderKind;

/// Core error type for `UsagePulse` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A provider lookup failed (adapter failure, expired credentials, ...).
    #[error("{provider} provider error: {message}")]
    Provider {
        /// The provider that failed.
        provider: ProviderKind,
        /// What went wrong.
        message: String,
    },

    /// The metrics sink rejected or failed to deliver a metric.
    #[error("Sink error: {0}")]
    Sink(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data returned by a provider.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Creates a provider error.
    pub fn provider(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Creates a sink error.
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink(message.into())
    }

    /// Returns the provider this error is attributed to, if any.
    pub fn provider_kind(&self) -> Option<ProviderKind> {
        match self {
            Self::Provider { provider, .. } => Some(*provider),
            _ => None,
        }
    }
}
