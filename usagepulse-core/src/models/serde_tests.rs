//! Serde shape tests for the wire-facing models.

use super::*;
use chrono::{TimeZone, Utc};

#[test]
fn test_provider_kind_snake_case() {
    let json = serde_json::to_string(&ProviderKind::VertexAi).unwrap();
    assert_eq!(json, "\"vertex_ai\"");
    let parsed: ProviderKind = serde_json::from_str("\"claude_code\"").unwrap();
    assert_eq!(parsed, ProviderKind::ClaudeCode);
}

#[test]
fn test_snapshot_optional_fields_default() {
    let parsed: UsageSnapshot =
        serde_json::from_str(r#"{"input_tokens":5,"output_tokens":7,"total_cost":0.25}"#).unwrap();
    assert_eq!(parsed.total_tokens(), 12);
    assert!(parsed.per_model_breakdown.is_empty());
    assert!(parsed.region_or_project_key.is_empty());
}

#[test]
fn test_metric_record_metadata_survives() {
    let ts = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
    let record = MetricRecord::new(ts, "bedrock", "us-west-2", 42.0, "tokens")
        .with_metadata("model", "claude-sonnet-4");
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["metadata"]["model"], "claude-sonnet-4");
    assert_eq!(json["project_tag"], "us-west-2");
}

#[test]
fn test_daemon_status_nulls() {
    let json = serde_json::to_value(DaemonStatus::default()).unwrap();
    assert_eq!(json["is_running"], false);
    assert!(json["last_error"].is_null());
}
