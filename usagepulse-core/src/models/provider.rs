//! Provider-related types.
//!
//! - [`ProviderKind`] - The four usage sources the daemon reports on
//! - [`ProviderRole`] - Where a provider sits in the dispatch order

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ============================================================================
// Provider Kind
// ============================================================================

/// Supported usage providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Local coding-assistant log store.
    ClaudeCode,
    /// Local IDE usage database.
    Cursor,
    /// AWS Bedrock usage metering, keyed by region.
    Bedrock,
    /// Google Cloud Vertex AI monitoring, keyed by `projectID:location`.
    VertexAi,
}

impl ProviderKind {
    /// Returns the display name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "Claude Code",
            Self::Cursor => "Cursor",
            Self::Bedrock => "AWS Bedrock",
            Self::VertexAi => "Vertex AI",
        }
    }

    /// Returns the stable identifier used in metric names and config keys.
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude_code",
            Self::Cursor => "cursor",
            Self::Bedrock => "bedrock",
            Self::VertexAi => "vertex_ai",
        }
    }

    /// Returns the role of this provider in a dispatch cycle.
    pub fn role(&self) -> ProviderRole {
        match self {
            Self::ClaudeCode => ProviderRole::Primary,
            Self::Cursor => ProviderRole::Secondary,
            Self::Bedrock => ProviderRole::CloudA,
            Self::VertexAi => ProviderRole::CloudB,
        }
    }

    /// Returns true for the cloud usage-metering providers.
    pub fn is_cloud(&self) -> bool {
        matches!(self, Self::Bedrock | Self::VertexAi)
    }

    /// Returns all providers in dispatch order.
    pub fn all() -> &'static [ProviderKind] {
        &[Self::ClaudeCode, Self::Cursor, Self::Bedrock, Self::VertexAi]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = CoreError;

    /// Parses a provider from its cli name or its role alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "claude_code" | "claude" | "primary" => Ok(Self::ClaudeCode),
            "cursor" | "secondary" => Ok(Self::Cursor),
            "bedrock" | "cloud_a" | "clouda" => Ok(Self::Bedrock),
            "vertex_ai" | "vertex" | "vertexai" | "cloud_b" | "cloudb" => Ok(Self::VertexAi),
            _ => Err(CoreError::InvalidConfig(format!("unknown provider: {s}"))),
        }
    }
}

// ============================================================================
// Provider Role
// ============================================================================

/// Position of a provider in a dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderRole {
    /// Source whose token count feeds the status store.
    Primary,
    /// Second local source.
    Secondary,
    /// First cloud provider.
    CloudA,
    /// Second cloud provider.
    CloudB,
}
