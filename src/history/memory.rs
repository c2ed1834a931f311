//! In-process history store

use super::{HistoryRecord, HistoryStore, NewHistoryRecord};
use crate::error::StoreError;
use std::sync::RwLock;
use uuid::Uuid;

/// Records kept in insertion order behind an `RwLock`
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        match self.records.read() {
            Ok(records) => records.len(),
            Err(err) => err.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("history lock poisoned".to_string())
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, record: NewHistoryRecord) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.push(record.with_id(id.clone()));
        Ok(id)
    }

    fn query(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;

        // Newest insertion first, then a stable sort keeps that order for equal timestamps
        let mut matching: Vec<HistoryRecord> = records
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }

    fn get(&self, record_id: &str, user_id: &str) -> Result<HistoryRecord, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let record = records
            .iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| StoreError::NotFound(record_id.to_string()))?;

        if record.user_id != user_id {
            return Err(StoreError::NotOwner(record_id.to_string()));
        }
        Ok(record.clone())
    }

    fn delete(&self, record_id: &str, user_id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let pos = records
            .iter()
            .position(|r| r.id == record_id)
            .ok_or_else(|| StoreError::NotFound(record_id.to_string()))?;

        if records[pos].user_id != user_id {
            return Err(StoreError::NotOwner(record_id.to_string()));
        }
        records.remove(pos);
        Ok(())
    }
}
