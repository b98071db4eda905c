use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::SummaryStore;
use crate::errors::StorageError;
use crate::models::CacheRecord;

/// Summary records as JSON strings under `{prefix}{user_id}`. No expiry.
#[derive(Clone)]
pub struct RedisSummaryStore {
    manager: ConnectionManager,
    key_prefix: String,
}

impl RedisSummaryStore {
    pub async fn new(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self {
            manager,
            key_prefix: key_prefix.into(),
        })
    }

    fn key(&self, user_id: &str) -> String {
        format!("{}{}", self.key_prefix, user_id)
    }
}

#[async_trait]
impl SummaryStore for RedisSummaryStore {
    async fn load_cache_record(&self, user_id: &str) -> Result<Option<CacheRecord>, StorageError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(self.key(user_id)).await?;
        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store_cache_record(
        &self,
        user_id: &str,
        record: &CacheRecord,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(record)?;
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(self.key(user_id), json).await?;
        Ok(())
    }
}
