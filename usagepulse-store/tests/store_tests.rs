//! Integration tests for the status store and configuration.

use std::sync::Arc;

use chrono::Utc;
use usagepulse_core::ProviderKind;
use usagepulse_store::{DaemonConfig, LogLevel, StatusStore, StoreError};

#[tokio::test]
async fn test_subscriber_sees_writes_from_other_tasks() {
    let store = Arc::new(StatusStore::new());
    let mut rx = store.subscribe();

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store.set_running(true).await;
            store.set_today_token_count(12345).await;
            store.record_send(Utc::now(), None).await;
        })
    };
    writer.await.unwrap();

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), 3);

    let status = store.get_status().await;
    assert!(status.is_running);
    assert_eq!(status.today_token_count, 12345);
    assert!(status.last_metrics_sent_at.is_some());
    assert!(status.next_metrics_send_at.is_none());
}

#[tokio::test]
async fn test_config_file_round_trip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("usagepulse").join("config.json");

    let mut config = DaemonConfig::default();
    config.general.host_label = "build-box".into();
    config.general.log_level = LogLevel::Trace;
    config.general.collect_timeout_secs = Some(45);
    config.set_provider_enabled(ProviderKind::VertexAi, true);
    config.save_to(&path).await.unwrap();

    let loaded = DaemonConfig::load_from(&path).await.unwrap();
    assert_eq!(loaded.general.host_label, "build-box");
    assert_eq!(loaded.collect_timeout().map(|d| d.as_secs()), Some(45));
    assert_eq!(
        loaded.enabled_providers(),
        vec![ProviderKind::ClaudeCode, ProviderKind::Cursor, ProviderKind::VertexAi]
    );
}

#[tokio::test]
async fn test_malformed_config_is_serialization_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("config.json");
    tokio::fs::write(&path, "{ interval_secs: 60 ").await.unwrap();

    let err = DaemonConfig::load_from(&path).await.unwrap_err();
    assert!(matches!(err, StoreError::Serialization(_)));
    assert!(!err.is_transient());
}
