use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::PathBuf;

use super::SummaryStore;
use crate::errors::StorageError;
use crate::models::CacheRecord;

/// AI summary records in the `ai_summaries` sqlite table, one row per user.
#[derive(Clone)]
pub struct SqliteSummaryStore {
    path: PathBuf,
}

impl SqliteSummaryStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let store = Self { path };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), StorageError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ai_summaries (
                user_id TEXT PRIMARY KEY,
                fingerprint TEXT NOT NULL,
                summary_text TEXT NOT NULL,
                written_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Result<Option<CacheRecord>, StorageError> {
        let conn = Connection::open(&self.path)?;
        let record = conn
            .query_row(
                "SELECT fingerprint, summary_text, written_at
                 FROM ai_summaries
                 WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(CacheRecord {
                        fingerprint: row.get(0)?,
                        text: row.get(1)?,
                        written_at: row.get::<_, DateTime<Utc>>(2)?,
                    })
                },
            )
            .optional()
            .map_err(|err| match err {
                rusqlite::Error::FromSqlConversionFailure(..)
                | rusqlite::Error::InvalidColumnType(..) => StorageError::Corrupt(err.to_string()),
                err => err.into(),
            })?;
        Ok(record)
    }

    /// Single upsert statement, so the row is replaced atomically.
    pub fn put(&self, user_id: &str, record: &CacheRecord) -> Result<(), StorageError> {
        let conn = Connection::open(&self.path)?;
        conn.execute(
            "INSERT INTO ai_summaries (user_id, fingerprint, summary_text, written_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                fingerprint = excluded.fingerprint,
                summary_text = excluded.summary_text,
                written_at = excluded.written_at",
            params![user_id, record.fingerprint, record.text, record.written_at],
        )?;
        Ok(())
    }
}

#[async_trait]
impl SummaryStore for SqliteSummaryStore {
    async fn load_cache_record(&self, user_id: &str) -> Result<Option<CacheRecord>, StorageError> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || repo.get(&user_id)).await?
    }

    async fn store_cache_record(
        &self,
        user_id: &str,
        record: &CacheRecord,
    ) -> Result<(), StorageError> {
        let repo = self.clone();
        let user_id = user_id.to_string();
        let record = record.clone();
        tokio::task::spawn_blocking(move || repo.put(&user_id, &record)).await?
    }
}
