use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SummarySettings;
use crate::errors::StorageError;
use crate::models::{ExpenseSnapshot, ProfileSnapshot, SummaryState, SummaryView};
use crate::repositories::{FinanceRepository, SummaryStore};
use crate::services::{RefreshJob, RefreshQueue, TextGenerator};
use crate::utils::{fingerprint, strip_from_marker};

/// AI budget summary cache: serves the stored summary and regenerates it in
/// the background whenever the profile or recent expenses change.
#[derive(Clone)]
pub struct SummaryService {
    store: Arc<dyn SummaryStore>,
    queue: Arc<RefreshQueue>,
    settings: SummarySettings,
}

impl SummaryService {
    pub fn new(
        store: Arc<dyn SummaryStore>,
        queue: Arc<RefreshQueue>,
        settings: SummarySettings,
    ) -> Self {
        Self {
            store,
            queue,
            settings,
        }
    }

    /// Build the service with its own refresh queue. Needs a tokio runtime.
    pub fn start(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn SummaryStore>,
        settings: SummarySettings,
    ) -> Self {
        let queue = Arc::new(RefreshQueue::start(generator, store.clone(), &settings));
        Self::new(store, queue, settings)
    }

    pub fn queue(&self) -> &RefreshQueue {
        &self.queue
    }

    fn display(&self, text: &str) -> String {
        strip_from_marker(text, &self.settings.strip_marker).to_string()
    }

    /// Never waits on text generation. An undecodable stored record counts as
    /// missing; any other storage read failure is returned to the caller.
    pub async fn get_or_refresh(
        &self,
        user_id: &str,
        profile: &ProfileSnapshot,
        expenses: &ExpenseSnapshot,
    ) -> Result<SummaryView, StorageError> {
        let current = fingerprint(profile, expenses);
        let record = match self.store.load_cache_record(user_id).await {
            Ok(record) => record,
            // Regeneration overwrites an undecodable record wholesale.
            Err(err @ (StorageError::Serialization(_) | StorageError::Corrupt(_))) => {
                warn!("Stored summary for user {} is unreadable: {}", user_id, err);
                None
            }
            Err(err) => return Err(err),
        };

        if let Some(record) = &record {
            if record.fingerprint == current {
                debug!("Summary for user {} is fresh", user_id);
                return Ok(SummaryView {
                    display_text: self.display(&record.text),
                    last_refreshed: Some(record.written_at),
                    state: SummaryState::Fresh,
                    refresh_scheduled: false,
                });
            }
        }

        let job = RefreshJob::new(user_id, current, profile.clone(), expenses.clone());
        let refresh_scheduled = self.queue.schedule(job).await;

        let view = match record {
            Some(record) => {
                info!("Summary for user {} is stale; serving previous text", user_id);
                SummaryView {
                    display_text: self.display(&record.text),
                    last_refreshed: Some(record.written_at),
                    state: SummaryState::StaleServingOldText,
                    refresh_scheduled,
                }
            }
            None => {
                info!("No summary for user {} yet; serving placeholder", user_id);
                SummaryView {
                    display_text: self.settings.placeholder.clone(),
                    last_refreshed: None,
                    state: SummaryState::StaleServingPlaceholder,
                    refresh_scheduled,
                }
            }
        };
        Ok(view)
    }

    /// Load the user's profile and most recent expenses, then `get_or_refresh`.
    pub async fn summary_for_user(
        &self,
        finance: &dyn FinanceRepository,
        user_id: &str,
    ) -> Result<SummaryView, StorageError> {
        let profile = finance.load_profile(user_id).await?;
        let limit = self.settings.recent_expense_limit;
        let recent = finance.load_recent_expenses(user_id, limit).await?;
        let expenses = ExpenseSnapshot::new(recent, limit);
        self.get_or_refresh(user_id, &profile, &expenses).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GenerationError;
    use crate::models::{CacheRecord, ExpenseRecord, NewExpense, ProfileField};
    use crate::repositories::{FileSummaryStore, SqliteFinanceRepo, SqliteSummaryStore};
    use crate::services::MockTextGenerator;
    use chrono::NaiveDate;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<SqliteSummaryStore>,
        service: SummaryService,
    }

    fn settings() -> SummarySettings {
        SummarySettings {
            workers: 1,
            queue_capacity: 8,
            placeholder: "generating…".to_string(),
            ..SummarySettings::default()
        }
    }

    fn fixture(generator: MockTextGenerator) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteSummaryStore::new(dir.path().join("fintracker.db")).unwrap());
        let service = SummaryService::start(Arc::new(generator), store.clone(), settings());
        Fixture {
            _dir: dir,
            store,
            service,
        }
    }

    fn profile() -> ProfileSnapshot {
        ProfileSnapshot::new()
            .with(ProfileField::AnnualIncome, 1_200_000)
            .with(ProfileField::MonthlyBudget, 12_000)
    }

    fn expenses() -> ExpenseSnapshot {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        ExpenseSnapshot::from(vec![ExpenseRecord::new("Groceries", 3000, date, "Food")])
    }

    #[tokio::test]
    async fn cold_start_serves_placeholder_then_generated_text() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .withf(|prompt: &str| prompt.contains("Expense Categories: Food"))
            .returning(|_| Ok("You are within budget.".to_string()));
        let fx = fixture(generator);

        let first = fx.service.get_or_refresh("alice", &profile(), &expenses()).await.unwrap();
        assert_eq!(first.display_text, "generating…");
        assert_eq!(first.state, SummaryState::StaleServingPlaceholder);
        assert!(first.last_refreshed.is_none());
        assert!(first.refresh_scheduled);

        fx.service.queue().wait_idle().await;

        let second = fx.service.get_or_refresh("alice", &profile(), &expenses()).await.unwrap();
        assert_eq!(second.display_text, "You are within budget.");
        assert_eq!(second.state, SummaryState::Fresh);
        assert!(second.last_refreshed.is_some());
        assert!(!second.refresh_scheduled);

        let record = fx.store.load_cache_record("alice").await.unwrap().unwrap();
        assert_eq!(record.fingerprint, fingerprint(&profile(), &expenses()));
    }

    #[tokio::test]
    async fn fresh_record_is_served_without_regeneration() {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();
        let fx = fixture(generator);
        let record = CacheRecord::new(fingerprint(&profile(), &expenses()), "Cached summary");
        fx.store.store_cache_record("alice", &record).await.unwrap();

        let first = fx.service.get_or_refresh("alice", &profile(), &expenses()).await.unwrap();
        let second = fx.service.get_or_refresh("alice", &profile(), &expenses()).await.unwrap();

        assert_eq!(first.display_text, "Cached summary");
        assert_eq!(first.display_text, second.display_text);
        assert_eq!(first.last_refreshed, Some(record.written_at));
        assert!(!first.refresh_scheduled && !second.refresh_scheduled);
        assert_eq!(fx.service.queue().in_flight(), 0);
    }

    #[tokio::test]
    async fn changed_inputs_serve_old_text_while_refreshing() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Ok("Updated summary".to_string()));
        let fx = fixture(generator);
        let old = CacheRecord::new(fingerprint(&profile(), &expenses()), "Old summary");
        fx.store.store_cache_record("alice", &old).await.unwrap();

        let changed = profile().with(ProfileField::MonthlyBudget, 15_000);
        let stale = fx.service.get_or_refresh("alice", &changed, &expenses()).await.unwrap();
        assert_eq!(stale.display_text, "Old summary");
        assert_eq!(stale.state, SummaryState::StaleServingOldText);
        assert_eq!(stale.last_refreshed, Some(old.written_at));
        assert!(stale.refresh_scheduled);

        fx.service.queue().wait_idle().await;
        let fresh = fx.service.get_or_refresh("alice", &changed, &expenses()).await.unwrap();
        assert_eq!(fresh.display_text, "Updated summary");
        assert_eq!(fresh.state, SummaryState::Fresh);
    }

    #[tokio::test]
    async fn generation_failure_is_persisted_and_served() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Err(GenerationError::EmptyResponse));
        let fx = fixture(generator);

        fx.service.get_or_refresh("alice", &profile(), &expenses()).await.unwrap();
        fx.service.queue().wait_idle().await;

        let view = fx.service.get_or_refresh("alice", &profile(), &expenses()).await.unwrap();
        assert!(view.display_text.starts_with("❌ AI Error"));
        let record = fx.store.load_cache_record("alice").await.unwrap().unwrap();
        assert_eq!(record.fingerprint, fingerprint(&profile(), &expenses()));
    }

    #[tokio::test]
    async fn display_text_is_cut_at_the_marker() {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();
        let fx = fixture(generator);
        let record = CacheRecord::new(
            fingerprint(&profile(), &expenses()),
            "Here are your insights.\nWould you like to export them?",
        );
        fx.store.store_cache_record("alice", &record).await.unwrap();

        let view = fx.service.get_or_refresh("alice", &profile(), &expenses()).await.unwrap();
        assert_eq!(view.display_text, "Here are your insights.");
    }

    #[tokio::test]
    async fn undecodable_file_record_is_regenerated() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Ok("Rebuilt summary".to_string()));
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileSummaryStore::new(dir.path()).unwrap());
        std::fs::write(dir.path().join("alice.json"), br#"{"fingerprint":"#).unwrap();
        let service = SummaryService::start(Arc::new(generator), store, settings());

        let first = service.get_or_refresh("alice", &profile(), &expenses()).await.unwrap();
        assert_eq!(first.state, SummaryState::StaleServingPlaceholder);
        assert!(first.refresh_scheduled);

        service.queue().wait_idle().await;
        let second = service.get_or_refresh("alice", &profile(), &expenses()).await.unwrap();
        assert_eq!(second.state, SummaryState::Fresh);
        assert_eq!(second.display_text, "Rebuilt summary");
    }

    #[tokio::test]
    async fn corrupt_sqlite_row_is_regenerated() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Ok("Rebuilt summary".to_string()));
        let fx = fixture(generator);
        rusqlite::Connection::open(fx._dir.path().join("fintracker.db"))
            .unwrap()
            .execute(
                "INSERT INTO ai_summaries (user_id, fingerprint, summary_text, written_at)
                 VALUES ('alice', 'abc', 'text', 'not a timestamp')",
                [],
            )
            .unwrap();

        let first = fx.service.get_or_refresh("alice", &profile(), &expenses()).await.unwrap();
        assert_eq!(first.state, SummaryState::StaleServingPlaceholder);
        fx.service.queue().wait_idle().await;

        let second = fx.service.get_or_refresh("alice", &profile(), &expenses()).await.unwrap();
        assert_eq!(second.state, SummaryState::Fresh);
        assert_eq!(second.display_text, "Rebuilt summary");
    }

    struct UnreachableStore;

    #[async_trait::async_trait]
    impl SummaryStore for UnreachableStore {
        async fn load_cache_record(&self, _: &str) -> Result<Option<CacheRecord>, StorageError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into())
        }

        async fn store_cache_record(&self, _: &str, _: &CacheRecord) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn other_read_failures_are_returned_without_scheduling() {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();
        let service =
            SummaryService::start(Arc::new(generator), Arc::new(UnreachableStore), settings());

        let err = service
            .get_or_refresh("alice", &profile(), &expenses())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert_eq!(service.queue().in_flight(), 0);
    }

    #[tokio::test]
    async fn summary_for_user_reads_the_finance_repository() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .withf(|prompt: &str| prompt.contains("Rent") && prompt.contains("Location: Chennai"))
            .returning(|_| Ok("Summary".to_string()));
        let fx = fixture(generator);
        let finance = SqliteFinanceRepo::new(fx._dir.path().join("finance.db")).unwrap();
        finance
            .add_expense(
                "alice",
                &NewExpense {
                    name: "Rent".to_string(),
                    amount: 8000,
                    date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                    category: "Housing".to_string(),
                },
            )
            .await
            .unwrap();
        finance
            .update_profile(
                "alice",
                &crate::models::ProfileUpdate {
                    location: Some("Chennai".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let first = fx.service.summary_for_user(&finance, "alice").await.unwrap();
        assert_eq!(first.state, SummaryState::StaleServingPlaceholder);
        fx.service.queue().wait_idle().await;
        let second = fx.service.summary_for_user(&finance, "alice").await.unwrap();
        assert_eq!(second.display_text, "Summary");
        assert_eq!(second.state, SummaryState::Fresh);
    }
}
