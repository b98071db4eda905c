use async_trait::async_trait;

use crate::errors::StorageError;
use crate::models::{
    CacheRecord, ExpenseRecord, ExpenseSort, NewExpense, ProfileSnapshot, ProfileUpdate,
};

pub mod cache_repo;
pub mod file_repo;
pub mod finance_repo;
pub mod redis_repo;

pub use cache_repo::*;
pub use file_repo::*;
pub use finance_repo::*;
pub use redis_repo::*;

/// Profile and expense data owned by the finance tracker.
#[async_trait]
pub trait FinanceRepository: Send + Sync {
    async fn load_profile(&self, user_id: &str) -> Result<ProfileSnapshot, StorageError>;

    /// Most recent expenses first, at most `limit` of them.
    async fn load_recent_expenses(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ExpenseRecord>, StorageError>;

    async fn load_all_expenses(&self, user_id: &str) -> Result<Vec<ExpenseRecord>, StorageError>;

    /// Expenses ordered by `sort` (ascending unless `descending`), or in
    /// insertion order when `sort` is `None`.
    async fn list_expenses(
        &self,
        user_id: &str,
        sort: Option<ExpenseSort>,
        descending: bool,
    ) -> Result<Vec<ExpenseRecord>, StorageError>;

    async fn add_expense(&self, user_id: &str, expense: &NewExpense) -> Result<i64, StorageError>;

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileSnapshot, StorageError>;
}

/// One AI summary record per user.
///
/// `store_cache_record` must replace the previous record atomically; readers
/// see either the old record or the new one, never a mix.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn load_cache_record(&self, user_id: &str) -> Result<Option<CacheRecord>, StorageError>;

    async fn store_cache_record(
        &self,
        user_id: &str,
        record: &CacheRecord,
    ) -> Result<(), StorageError>;
}
