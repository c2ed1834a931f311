//! Label Set
//!
//! The ordered list of class labels matching classifier output positions.
//! Exported next to the model as `class_indices.json`: `{"Pepper__bell___Bacterial_spot": 0, ...}`.

use crate::error::DataError;
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Build from labels already in classifier order
    pub fn new(labels: Vec<String>) -> Result<Self, DataError> {
        if labels.is_empty() {
            return Err(DataError::InvalidLabelSet("label set is empty".to_string()));
        }
        Ok(Self { labels })
    }

    /// Load a `{label: index}` JSON file
    pub fn from_class_indices(path: &Path) -> Result<Self, DataError> {
        let contents = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let set = Self::from_class_indices_str(&contents)?;
        tracing::info!("Loaded {} class labels from {}", set.len(), path.display());
        Ok(set)
    }

    /// Parse `{label: index}` JSON; indices must cover 0..n exactly once
    pub fn from_class_indices_str(json: &str) -> Result<Self, DataError> {
        let map: serde_json::Map<String, Value> = serde_json::from_str(json)?;
        let mut slots: Vec<Option<String>> = vec![None; map.len()];

        for (label, value) in map {
            let index = value
                .as_u64()
                .ok_or_else(|| DataError::InvalidLabelSet(format!("index for '{}' is not an integer", label)))?;
            let index = usize::try_from(index)
                .map_err(|_| DataError::InvalidLabelSet(format!("index {} for '{}' does not fit in usize", index, label)))?;

            let slot = slots
                .get_mut(index)
                .ok_or_else(|| DataError::InvalidLabelSet(format!("index {} for '{}' is out of range", index, label)))?;

            if let Some(existing) = slot.as_ref() {
                return Err(DataError::InvalidLabelSet(format!(
                    "index {} assigned to both '{}' and '{}'",
                    index, existing, label
                )));
            }
            *slot = Some(label);
        }

        // No gaps possible once every index is in range and unique
        Self::new(slots.into_iter().flatten().collect())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}
