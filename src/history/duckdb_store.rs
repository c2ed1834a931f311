//! DuckDB-backed history store
//!
//! One `diagnoses` table in a local database file. Alternatives are stored as
//! JSON text and timestamps as fixed-width RFC 3339 strings so they order
//! lexicographically.

use super::{HistoryRecord, HistoryStore, NewHistoryRecord};
use crate::diagnosis::AlternativeEntry;
use crate::error::StoreError;
use crate::labels::DisplayLabel;
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection};
use std::fmt::Display;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

const SCHEMA: &str = "
    CREATE SEQUENCE IF NOT EXISTS diagnoses_seq;
    CREATE TABLE IF NOT EXISTS diagnoses (
        id VARCHAR PRIMARY KEY,
        seq BIGINT NOT NULL DEFAULT nextval('diagnoses_seq'),
        user_id VARCHAR NOT NULL,
        plant_name VARCHAR NOT NULL,
        disease_name VARCHAR NOT NULL,
        confidence DOUBLE NOT NULL,
        is_healthy BOOLEAN NOT NULL,
        alternatives VARCHAR NOT NULL,
        image_path VARCHAR,
        created_at VARCHAR NOT NULL
    );
";

pub struct DuckDbHistoryStore {
    conn: Mutex<Connection>,
}

const SELECT_COLUMNS: &str =
    "id, user_id, plant_name, disease_name, confidence, is_healthy, alternatives, image_path, created_at";

fn backend(e: impl Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

struct Row {
    id: String,
    user_id: String,
    plant_name: String,
    disease_name: String,
    confidence: f64,
    is_healthy: bool,
    alternatives: String,
    image_path: Option<String>,
    created_at: String,
}

impl Row {
    /// Columns in `SELECT_COLUMNS` order
    fn read(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Row {
            id: row.get(0)?,
            user_id: row.get(1)?,
            plant_name: row.get(2)?,
            disease_name: row.get(3)?,
            confidence: row.get(4)?,
            is_healthy: row.get(5)?,
            alternatives: row.get(6)?,
            image_path: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<HistoryRecord, StoreError> {
        let alternatives: Vec<AlternativeEntry> = serde_json::from_str(&self.alternatives).map_err(backend)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(backend)?
            .with_timezone(&Utc);

        Ok(HistoryRecord {
            id: self.id,
            user_id: self.user_id,
            display_label: DisplayLabel {
                plant_name: self.plant_name,
                disease_name: self.disease_name,
            },
            confidence: self.confidence,
            is_healthy: self.is_healthy,
            alternatives,
            image_path: self.image_path,
            created_at,
        })
    }
}

impl DuckDbHistoryStore {
    /// Open (or create) the database file
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        tracing::info!("Opened history database {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory().map_err(backend)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("history connection lock poisoned".to_string()))
    }
}

impl HistoryStore for DuckDbHistoryStore {
    fn append(&self, record: NewHistoryRecord) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let alternatives = serde_json::to_string(&record.alternatives).map_err(backend)?;
        let created_at = record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true);

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO diagnoses
                (id, user_id, plant_name, disease_name, confidence, is_healthy, alternatives, image_path, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                record.user_id,
                record.display_label.plant_name,
                record.display_label.disease_name,
                record.confidence,
                record.is_healthy,
                alternatives,
                record.image_path,
                created_at,
            ],
        )
        .map_err(backend)?;

        Ok(id)
    }

    fn query(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        let limit = limit.min(i64::MAX as usize) as i64;
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM diagnoses
                 WHERE user_id = ?
                 ORDER BY created_at DESC, seq DESC
                 LIMIT ?"
            ))
            .map_err(backend)?;

        let rows = stmt.query_map(params![user_id, limit], Row::read).map_err(backend)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(backend)?.into_record()?);
        }
        Ok(records)
    }

    fn get(&self, record_id: &str, user_id: &str) -> Result<HistoryRecord, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {SELECT_COLUMNS} FROM diagnoses WHERE id = ?"))
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![record_id], Row::read)
            .map_err(backend)?
            .collect::<Result<Vec<Row>, _>>()
            .map_err(backend)?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(record_id.to_string()))?;
        if row.user_id != user_id {
            return Err(StoreError::NotOwner(record_id.to_string()));
        }
        row.into_record()
    }

    fn delete(&self, record_id: &str, user_id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT user_id FROM diagnoses WHERE id = ?")
            .map_err(backend)?;
        let owners = stmt
            .query_map(params![record_id], |row| row.get::<_, String>(0))
            .map_err(backend)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(backend)?;

        match owners.first() {
            None => Err(StoreError::NotFound(record_id.to_string())),
            Some(owner) if owner != user_id => Err(StoreError::NotOwner(record_id.to_string())),
            Some(_) => {
                conn.execute("DELETE FROM diagnoses WHERE id = ?", params![record_id])
                    .map_err(backend)?;
                Ok(())
            }
        }
    }
}
