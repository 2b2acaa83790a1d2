//! Historical collection wiring.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use usagepulse_collect::{ConcurrentCollector, MergedRow, SourceMerger};
use usagepulse_core::CollectorAdapter;
use usagepulse_store::DaemonConfig;

use crate::error::DaemonError;

/// Builds a collector for the enabled metric types.
///
/// Adapters for disabled providers are left out, and the configured per-task
/// timeout is applied when present.
pub fn build_collector(
    config: &DaemonConfig,
    adapters: Vec<Arc<dyn CollectorAdapter>>,
) -> ConcurrentCollector {
    let enabled: Vec<Arc<dyn CollectorAdapter>> = adapters
        .into_iter()
        .filter(|a| config.is_provider_enabled(a.kind()))
        .collect();
    let collector = ConcurrentCollector::with_adapters(enabled);
    match config.collect_timeout() {
        Some(timeout) => collector.with_task_timeout(timeout),
        None => collector,
    }
}

/// Collects `[start, end]` and merges the records into per-day rows.
///
/// Rows come back ordered by timestamp, then host.
///
/// # Errors
///
/// Propagates [`ConcurrentCollector::collect`] errors.
pub async fn collect_merged<S: AsRef<str>>(
    collector: &ConcurrentCollector,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    metric_types: &[S],
) -> Result<Vec<MergedRow>, DaemonError> {
    let records = collector.collect(start, end, metric_types).await?;
    let mut merger = SourceMerger::new();
    merger.extend(&records);
    let rows = merger.into_sorted_rows();
    info!(records = records.len(), rows = rows.len(), "Merged historical records");
    Ok(rows)
}
