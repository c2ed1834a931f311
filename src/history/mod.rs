//! Diagnosis history
//!
//! The persistence collaborator the orchestrator hands accepted results to.
//! Stores are keyed by user; single-record reads and deletes are ownership-checked.

pub mod image_archive;
pub mod memory;
#[cfg(feature = "persistence")]
pub mod duckdb_store;

pub use image_archive::ImageArchive;
pub use memory::MemoryHistoryStore;
#[cfg(feature = "persistence")]
pub use duckdb_store::DuckDbHistoryStore;

use crate::diagnosis::AlternativeEntry;
use crate::error::StoreError;
use crate::labels::DisplayLabel;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A record before the store has assigned its id
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryRecord {
    pub user_id: String,
    pub display_label: DisplayLabel,
    /// Percent, 0-100
    pub confidence: f64,
    pub is_healthy: bool,
    pub alternatives: Vec<AlternativeEntry>,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewHistoryRecord {
    pub fn with_id(self, id: String) -> HistoryRecord {
        HistoryRecord {
            id,
            user_id: self.user_id,
            display_label: self.display_label,
            confidence: self.confidence,
            is_healthy: self.is_healthy,
            alternatives: self.alternatives,
            image_path: self.image_path,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub user_id: String,
    pub display_label: DisplayLabel,
    pub confidence: f64,
    pub is_healthy: bool,
    pub alternatives: Vec<AlternativeEntry>,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserStatistics {
    pub total: usize,
    pub healthy_count: usize,
    pub diseased_count: usize,
    pub most_common_plant: Option<String>,
    pub most_common_disease: Option<String>,
    pub average_confidence: f64,
}

impl UserStatistics {
    /// Summarize records; most-common ties go to the newest record
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let healthy_count = records.iter().filter(|r| r.is_healthy).count();
        let total_confidence: f64 = records.iter().map(|r| r.confidence).sum();

        Self {
            total: records.len(),
            healthy_count,
            diseased_count: records.len() - healthy_count,
            most_common_plant: most_common(records.iter().map(|r| r.display_label.plant_name.as_str())),
            most_common_disease: most_common(records.iter().map(|r| r.display_label.disease_name.as_str())),
            average_confidence: total_confidence / records.len() as f64,
        }
    }
}

fn most_common<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: FxHashMap<&str, (usize, usize)> = FxHashMap::default();
    for (pos, value) in values.enumerate() {
        counts.entry(value).or_insert((0, pos)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(value, _)| value.to_string())
}

/// Display order for a page of history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySort {
    #[default]
    Newest,
    Oldest,
    ConfidenceDesc,
    ConfidenceAsc,
}

impl HistorySort {
    /// Reorder records given most recent first, as `query` returns them.
    /// Confidence ties keep their recency order.
    pub fn apply(self, records: &mut [HistoryRecord]) {
        match self {
            HistorySort::Newest => {}
            HistorySort::Oldest => records.reverse(),
            HistorySort::ConfidenceDesc => records.sort_by(|a, b| b.confidence.total_cmp(&a.confidence)),
            HistorySort::ConfidenceAsc => records.sort_by(|a, b| a.confidence.total_cmp(&b.confidence)),
        }
    }
}

/// History persistence backend
pub trait HistoryStore: Send + Sync {
    /// Store a record and return its id
    fn append(&self, record: NewHistoryRecord) -> Result<String, StoreError>;

    /// A user's records, most recent first
    fn query(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>, StoreError>;

    /// One record owned by `user_id`
    fn get(&self, record_id: &str, user_id: &str) -> Result<HistoryRecord, StoreError>;

    /// Remove a record owned by `user_id`
    fn delete(&self, record_id: &str, user_id: &str) -> Result<(), StoreError>;

    /// The `limit` most recent records, reordered by `sort`
    fn query_sorted(&self, user_id: &str, limit: usize, sort: HistorySort) -> Result<Vec<HistoryRecord>, StoreError> {
        let mut records = self.query(user_id, limit)?;
        sort.apply(&mut records);
        Ok(records)
    }

    fn statistics(&self, user_id: &str) -> Result<UserStatistics, StoreError> {
        let records = self.query(user_id, usize::MAX)?;
        Ok(UserStatistics::from_records(&records))
    }
}
