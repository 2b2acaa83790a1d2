//! Same-day merging of records from several sources.
//!
//! When two streams are combined into one exported row, records are grouped
//! by `(unix timestamp, host tag)`. Each source contributes one facet; a
//! later record for an existing key replaces only its own facet and the row
//! total is recomputed from whatever facets are present.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use usagepulse_core::MetricRecord;

/// One merged row: every facet seen for a `(timestamp, host)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    /// Bucket timestamp.
    pub timestamp: DateTime<Utc>,
    /// Host (project) tag shared by the merged records.
    pub host_tag: String,
    /// Facet values keyed by source tag.
    pub facets: BTreeMap<String, f64>,
    /// Sum of all facets.
    pub total: f64,
}

impl MergedRow {
    fn new(timestamp: DateTime<Utc>, host_tag: String) -> Self {
        Self {
            timestamp,
            host_tag,
            facets: BTreeMap::new(),
            total: 0.0,
        }
    }

    /// Returns the value of one facet.
    pub fn facet(&self, source_tag: &str) -> Option<f64> {
        self.facets.get(source_tag).copied()
    }

    fn set_facet(&mut self, source_tag: &str, value: f64) {
        self.facets.insert(source_tag.to_string(), value);
        self.total = self.facets.values().sum();
    }
}

/// Accumulates records into [`MergedRow`]s.
///
/// Iteration order of [`SourceMerger::into_rows`] is unspecified; use
/// [`SourceMerger::into_sorted_rows`] when output must be stable.
#[derive(Debug, Default)]
pub struct SourceMerger {
    rows: HashMap<(i64, String), MergedRow>,
}

impl SourceMerger {
    /// Creates an empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one record; its `source_tag` names the facet it carries.
    pub fn add(&mut self, record: &MetricRecord) {
        let key = (record.unix_timestamp(), record.project_tag.clone());
        self.rows
            .entry(key)
            .or_insert_with(|| MergedRow::new(record.timestamp, record.project_tag.clone()))
            .set_facet(&record.source_tag, record.value);
    }

    /// Merges every record from an iterator.
    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a MetricRecord>) {
        for record in records {
            self.add(record);
        }
    }

    /// Returns the number of distinct `(timestamp, host)` rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if nothing was merged.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the merged rows in unspecified order.
    pub fn into_rows(self) -> Vec<MergedRow> {
        self.rows.into_values().collect()
    }

    /// Returns the merged rows ordered by timestamp, then host.
    pub fn into_sorted_rows(self) -> Vec<MergedRow> {
        let mut rows = self.into_rows();
        rows.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.host_tag.cmp(&b.host_tag))
        });
        rows
    }
}
