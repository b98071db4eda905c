use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use super::SummaryStore;
use crate::errors::StorageError;
use crate::models::CacheRecord;

#[derive(Serialize, Deserialize)]
struct StoredSummary {
    fingerprint: String,
    text: String,
}

/// One JSON file per user. `written_at` comes from the file's mtime.
#[derive(Clone)]
pub struct FileSummaryStore {
    dir: PathBuf,
}

impl FileSummaryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        let simple = !user_id.is_empty()
            && user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        // Hex-encoded names start with '_', which simple names cannot contain.
        let stem = if simple {
            user_id.to_string()
        } else {
            format!("_{}", hex::encode(user_id.as_bytes()))
        };
        self.dir.join(format!("{}.json", stem))
    }
}

#[async_trait]
impl SummaryStore for FileSummaryStore {
    async fn load_cache_record(&self, user_id: &str) -> Result<Option<CacheRecord>, StorageError> {
        let path = self.path_for(user_id);
        // Content and mtime come from one handle so a concurrent rename
        // cannot pair one record's text with another's timestamp.
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let modified = file.metadata().await?.modified()?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).await?;
        let stored: StoredSummary = serde_json::from_slice(&bytes)?;
        Ok(Some(CacheRecord {
            fingerprint: stored.fingerprint,
            text: stored.text,
            written_at: DateTime::<Utc>::from(modified),
        }))
    }

    /// Writes a sibling temp file and renames it over the old record.
    async fn store_cache_record(
        &self,
        user_id: &str,
        record: &CacheRecord,
    ) -> Result<(), StorageError> {
        let path = self.path_for(user_id);
        let tmp = path.with_extension(format!("json.tmp-{}", Uuid::new_v4()));
        let body = serde_json::to_vec(&StoredSummary {
            fingerprint: record.fingerprint.clone(),
            text: record.text.clone(),
        })?;
        tokio::fs::write(&tmp, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_file_is_no_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSummaryStore::new(dir.path()).unwrap();
        assert!(store.load_cache_record("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_then_load_uses_file_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSummaryStore::new(dir.path()).unwrap();
        let before = Utc::now() - chrono::Duration::seconds(5);

        store
            .store_cache_record("alice", &CacheRecord::new("f".repeat(64), "old"))
            .await
            .unwrap();
        store
            .store_cache_record("alice", &CacheRecord::new("e".repeat(64), "new"))
            .await
            .unwrap();

        let record = store.load_cache_record("alice").await.unwrap().unwrap();
        assert_eq!(record.fingerprint, "e".repeat(64));
        assert_eq!(record.text, "new");
        assert!(record.written_at >= before);
    }

    #[tokio::test]
    async fn written_at_is_the_mtime_of_the_file_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSummaryStore::new(dir.path()).unwrap();
        store
            .store_cache_record("alice", &CacheRecord::new("f".repeat(64), "text"))
            .await
            .unwrap();
        let pinned = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_750_000_000);
        std::fs::File::options()
            .write(true)
            .open(dir.path().join("alice.json"))
            .unwrap()
            .set_modified(pinned)
            .unwrap();

        let record = store.load_cache_record("alice").await.unwrap().unwrap();
        assert_eq!(record.text, "text");
        assert_eq!(record.written_at, DateTime::<Utc>::from(pinned));
    }

    #[tokio::test]
    async fn no_temp_files_are_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSummaryStore::new(dir.path()).unwrap();
        store
            .store_cache_record("alice", &CacheRecord::new("f".repeat(64), "text"))
            .await
            .unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["alice.json".to_string()]);
    }

    #[tokio::test]
    async fn unsafe_user_ids_stay_inside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSummaryStore::new(dir.path()).unwrap();
        store
            .store_cache_record("../evil/user", &CacheRecord::new("f".repeat(64), "a"))
            .await
            .unwrap();
        store
            .store_cache_record("user@example.com", &CacheRecord::new("f".repeat(64), "b"))
            .await
            .unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
        let record = store.load_cache_record("../evil/user").await.unwrap().unwrap();
        assert_eq!(record.text, "a");
    }
}
