//! Usage snapshot types.
//!
//! - [`UsageSnapshot`] - Aggregate usage for one provider, key and time window
//! - [`ModelMetric`] - Per-model slice of a snapshot

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Usage Snapshot
// ============================================================================

/// Aggregate usage reported by a provider for a single key and time window.
///
/// The key is a region for Bedrock and `projectID:location` for Vertex AI.
/// Snapshots are values: once built they are only ever cloned, never mutated
/// in place by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Input (prompt) tokens.
    pub input_tokens: i64,
    /// Output (completion) tokens.
    pub output_tokens: i64,
    /// Total cost in USD.
    pub total_cost: f64,
    /// Per-model breakdown.
    #[serde(default)]
    pub per_model_breakdown: Vec<ModelMetric>,
    /// Region or `projectID:location` the snapshot was taken for.
    #[serde(default)]
    pub region_or_project_key: String,
    /// Account or location label.
    #[serde(default)]
    pub account_or_location: String,
}

impl UsageSnapshot {
    /// Creates a snapshot with the given token counts.
    pub fn new(input_tokens: i64, output_tokens: i64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            ..Default::default()
        }
    }

    /// Sets the total cost.
    pub fn with_cost(mut self, total_cost: f64) -> Self {
        self.total_cost = total_cost;
        self
    }

    /// Sets the region or project key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.region_or_project_key = key.into();
        self
    }

    /// Sets the account or location label.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account_or_location = account.into();
        self
    }

    /// Adds a per-model entry.
    pub fn with_model(mut self, model: ModelMetric) -> Self {
        self.per_model_breakdown.push(model);
        self
    }

    /// Returns true when both token counts are zero.
    pub fn is_empty(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0
    }

    /// Returns input plus output tokens.
    pub fn total_tokens(&self) -> i64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Validates the snapshot data.
    ///
    /// Token counts must be non-negative and cost must be a finite,
    /// non-negative number, for the snapshot as a whole and for every
    /// per-model entry.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidData` describing the first offending field.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_counts(self.input_tokens, self.output_tokens, self.total_cost)
            .map_err(CoreError::InvalidData)?;
        for model in &self.per_model_breakdown {
            model.validate().map_err(|e| {
                CoreError::InvalidData(format!("model {}: {e}", model.model_name))
            })?;
        }
        Ok(())
    }
}

// ============================================================================
// Model Metric
// ============================================================================

/// Usage attributed to one model inside a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetric {
    /// Model identifier (e.g. "claude-sonnet-4").
    pub model_name: String,
    /// Input tokens for this model.
    pub input_tokens: i64,
    /// Output tokens for this model.
    pub output_tokens: i64,
    /// Cost in USD for this model.
    pub cost: f64,
}

impl ModelMetric {
    /// Creates a new per-model entry.
    pub fn new(model_name: impl Into<String>, input_tokens: i64, output_tokens: i64) -> Self {
        Self {
            model_name: model_name.into(),
            input_tokens,
            output_tokens,
            cost: 0.0,
        }
    }

    /// Returns total tokens for this model.
    pub fn total_tokens(&self) -> i64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    fn validate(&self) -> Result<(), String> {
        validate_counts(self.input_tokens, self.output_tokens, self.cost)
    }
}

/// Validates a plain token count, as reported by the local sources.
///
/// # Errors
///
/// Returns `CoreError::InvalidData` for a negative count.
pub fn validate_token_count(count: i64) -> Result<(), CoreError> {
    if count < 0 {
        return Err(CoreError::InvalidData(format!(
            "token count must be non-negative, got {count}"
        )));
    }
    Ok(())
}

fn validate_counts(input: i64, output: i64, cost: f64) -> Result<(), String> {
    if input < 0 {
        return Err(format!("input_tokens must be non-negative, got {input}"));
    }
    if output < 0 {
        return Err(format!("output_tokens must be non-negative, got {output}"));
    }
    if !cost.is_finite() || cost < 0.0 {
        return Err(format!("cost must be a finite non-negative number, got {cost}"));
    }
    Ok(())
}
