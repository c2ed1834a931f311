//! Remediation Knowledge Base
//!
//! Static symptom/cause/treatment content keyed by label strings that are
//! close to, but not always identical with, the classifier's labels. Parsed
//! once at startup and kept in file order so fuzzy matching is reproducible.

use crate::error::DataError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Remediation content for one disease class
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemediationRecord {
    #[serde(default)]
    pub symptoms: Vec<String>,
    /// Why the symptoms point at this disease
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why_this_disease: Option<String>,
    #[serde(default)]
    pub cause: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
    #[serde(default)]
    pub treatment: Vec<String>,
    #[serde(default)]
    pub prevention: Vec<String>,
}

/// Insertion-ordered mapping from knowledge-base key to record
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: Vec<(String, RemediationRecord)>,
    index: FxHashMap<String, usize>,
}

impl KnowledgeBase {
    /// Build from entries in the order they should be searched
    ///
    /// A repeated key keeps its first position and takes the later record.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, RemediationRecord)>,
    {
        let mut kb = Self::default();
        for (key, record) in entries {
            kb.insert(key, record);
        }
        kb
    }

    fn insert(&mut self, key: String, record: RemediationRecord) {
        if let Some(&pos) = self.index.get(&key) {
            self.entries[pos].1 = record;
            return;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, record));
    }

    /// Parse a JSON object `{key: record}`, keeping key order
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut entries = Vec::with_capacity(map.len());

        for (key, value) in map {
            let record: RemediationRecord =
                serde_json::from_value(value).map_err(|e| DataError::InvalidRecord {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
            entries.push((key, record));
        }

        Ok(Self::from_entries(entries))
    }

    /// Load the knowledge base file
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let contents = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let kb = Self::from_json_str(&contents)?;
        tracing::info!("Loaded {} remediation records from {}", kb.len(), path.display());
        Ok(kb)
    }

    pub fn get(&self, key: &str) -> Option<&RemediationRecord> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    /// Stored key and record for `key`
    pub fn get_key_value(&self, key: &str) -> Option<(&str, &RemediationRecord)> {
        self.index.get(key).and_then(|&pos| self.entry(pos))
    }

    /// Entry at an insertion position
    pub fn entry(&self, pos: usize) -> Option<(&str, &RemediationRecord)> {
        self.entries.get(pos).map(|(k, r)| (k.as_str(), r))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RemediationRecord)> {
        self.entries.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
