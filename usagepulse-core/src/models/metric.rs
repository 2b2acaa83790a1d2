//! Metric record types.
//!
//! - [`MetricRecord`] - One exported data point
//! - [`parse_metric_types`] - Expands a requested metric-type list

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::provider::ProviderKind;
use crate::error::CoreError;

/// Metric-type name that selects every provider.
pub const ALL_METRIC_TYPES: &str = "all";

// ============================================================================
// Metric Record
// ============================================================================

/// A single metric data point produced by a collection cycle.
///
/// Records are built with the `with_*` methods and are not mutated after
/// metadata has been attached; consumers take them by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// When the value was observed (start of the bucket for daily data).
    pub timestamp: DateTime<Utc>,
    /// Which source produced the value (e.g. "bedrock").
    pub source_tag: String,
    /// Project, region or host the value belongs to.
    pub project_tag: String,
    /// The value itself.
    pub value: f64,
    /// Unit of the value (e.g. "tokens", "usd").
    pub unit: String,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl MetricRecord {
    /// Creates a record without metadata.
    pub fn new(
        timestamp: DateTime<Utc>,
        source_tag: impl Into<String>,
        project_tag: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            source_tag: source_tag.into(),
            project_tag: project_tag.into(),
            value,
            unit: unit.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attaches a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the timestamp as Unix seconds.
    pub fn unix_timestamp(&self) -> i64 {
        self.timestamp.timestamp()
    }
}

/// Sorts records by timestamp, oldest first.
///
/// The sort is stable, so records sharing a timestamp keep their relative order.
pub fn sort_records_by_timestamp(records: &mut [MetricRecord]) {
    records.sort_by_key(|r| r.timestamp);
}

// ============================================================================
// Metric Types
// ============================================================================

/// Expands a requested metric-type list into providers.
///
/// An empty list, or any list containing `"all"`, selects every provider.
/// Duplicates are dropped, keeping the first occurrence.
///
/// # Errors
///
/// Returns `CoreError::InvalidConfig` for a name outside the allow-set.
pub fn parse_metric_types<S: AsRef<str>>(types: &[S]) -> Result<Vec<ProviderKind>, CoreError> {
    if types.is_empty()
        || types
            .iter()
            .any(|t| t.as_ref().trim().eq_ignore_ascii_case(ALL_METRIC_TYPES))
    {
        return Ok(ProviderKind::all().to_vec());
    }

    let mut kinds = Vec::with_capacity(types.len());
    for name in types {
        let kind: ProviderKind = name.as_ref().parse().map_err(|_| {
            CoreError::InvalidConfig(format!("invalid metric type: {}", name.as_ref()))
        })?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_list_means_all() {
        let empty: [&str; 0] = [];
        assert_eq!(parse_metric_types(&empty).unwrap(), ProviderKind::all());
        assert_eq!(parse_metric_types(&["all"]).unwrap(), ProviderKind::all());
        assert_eq!(parse_metric_types(&["cursor", "ALL"]).unwrap(), ProviderKind::all());
    }

    #[test]
    fn test_dedup_keeps_order() {
        let kinds = parse_metric_types(&["vertex_ai", "primary", "cloud_b"]).unwrap();
        assert_eq!(kinds, vec![ProviderKind::VertexAi, ProviderKind::ClaudeCode]);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = parse_metric_types(&["bedrock", "openai"]).unwrap_err();
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn test_sort_by_timestamp() {
        let later = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut records = vec![
            MetricRecord::new(later, "bedrock", "us-east-1", 1.0, "tokens"),
            MetricRecord::new(earlier, "bedrock", "us-east-1", 2.0, "tokens"),
        ];
        sort_records_by_timestamp(&mut records);
        assert_eq!(records[0].timestamp, earlier);
    }
}
