use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::SummarySettings;
use crate::models::{CacheRecord, ExpenseSnapshot, ProfileSnapshot};
use crate::repositories::SummaryStore;
use crate::services::TextGenerator;
use crate::utils::{budget_summary_prompt, generation_error_text};

/// One regeneration of one user's summary.
#[derive(Debug, Clone)]
pub struct RefreshJob {
    pub id: Uuid,
    pub user_id: String,
    pub fingerprint: String,
    pub profile: ProfileSnapshot,
    pub expenses: ExpenseSnapshot,
}

impl RefreshJob {
    pub fn new(
        user_id: impl Into<String>,
        fingerprint: impl Into<String>,
        profile: ProfileSnapshot,
        expenses: ExpenseSnapshot,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            fingerprint: fingerprint.into(),
            profile,
            expenses,
        }
    }
}

struct WorkerContext {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn SummaryStore>,
    currency_symbol: String,
}

impl WorkerContext {
    /// Generation failures become error-marked text; storage failures are logged.
    async fn process(&self, job: RefreshJob) {
        let prompt = budget_summary_prompt(&job.profile, &job.expenses, &self.currency_symbol);
        let text = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(err) => {
                warn!("Summary generation failed: {}", err);
                generation_error_text(&err)
            }
        };

        let record = CacheRecord::new(job.fingerprint, text);
        match self.store.store_cache_record(&job.user_id, &record).await {
            Ok(()) => info!("Stored refreshed summary"),
            Err(err) => error!("Failed to store refreshed summary: {}", err),
        }
    }
}

/// Bounded work queue of summary regenerations, drained by a pool of tokio workers.
///
/// Must be started inside a tokio runtime. Dropping the queue closes it and
/// lets the workers exit once the remaining jobs are done.
pub struct RefreshQueue {
    sender: Mutex<Option<mpsc::Sender<RefreshJob>>>,
    in_flight: Arc<watch::Sender<usize>>,
    active_users: Option<Arc<Mutex<HashSet<String>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl RefreshQueue {
    pub fn start(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn SummaryStore>,
        settings: &SummarySettings,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let (in_flight, _) = watch::channel(0usize);
        let in_flight = Arc::new(in_flight);
        let active_users = settings
            .single_flight
            .then(|| Arc::new(Mutex::new(HashSet::new())));
        let context = Arc::new(WorkerContext {
            generator,
            store,
            currency_symbol: settings.currency_symbol.clone(),
        });

        let worker_count = settings.workers.max(1);
        let workers = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    receiver.clone(),
                    context.clone(),
                    in_flight.clone(),
                    active_users.clone(),
                ))
            })
            .collect();
        info!(
            "Started summary refresh queue with {} workers (capacity {}, single-flight {})",
            worker_count, settings.queue_capacity, settings.single_flight
        );

        Self {
            sender: Mutex::new(Some(sender)),
            in_flight,
            active_users,
            workers: Mutex::new(workers),
        }
    }

    /// Enqueue without waiting. Returns `false` when the job was not queued:
    /// the queue is full or closed, or single-flight is on and the user already
    /// has a regeneration pending.
    pub async fn schedule(&self, job: RefreshJob) -> bool {
        if let Some(active) = &self.active_users {
            if !active.lock().await.insert(job.user_id.clone()) {
                debug!("Refresh already in flight for user {}", job.user_id);
                return false;
            }
        }

        let sender = self.sender.lock().await;
        let Some(sender) = sender.as_ref() else {
            warn!("Refresh queue is shut down; dropping job for user {}", job.user_id);
            self.release(&job.user_id).await;
            return false;
        };

        self.in_flight.send_modify(|n| *n += 1);
        let job_id = job.id;
        match sender.try_send(job) {
            Ok(()) => {
                debug!("Scheduled refresh job {}", job_id);
                true
            }
            Err(err) => {
                let job = match err {
                    mpsc::error::TrySendError::Full(job) => {
                        warn!("Refresh queue full; dropping job for user {}", job.user_id);
                        job
                    }
                    mpsc::error::TrySendError::Closed(job) => {
                        warn!("Refresh queue closed; dropping job for user {}", job.user_id);
                        job
                    }
                };
                self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
                self.release(&job.user_id).await;
                false
            }
        }
    }

    async fn release(&self, user_id: &str) {
        if let Some(active) = &self.active_users {
            active.lock().await.remove(user_id);
        }
    }

    /// Jobs queued or running.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Resolves once no job is queued or running.
    pub async fn wait_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Stop accepting jobs, then wait for the workers to drain the queue.
    pub async fn shutdown(&self) {
        self.sender.lock().await.take();
        let workers = std::mem::take(&mut *self.workers.lock().await);
        for worker in workers {
            if let Err(err) = worker.await {
                error!("Refresh worker ended abnormally: {}", err);
            }
        }
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<RefreshJob>>>,
    context: Arc<WorkerContext>,
    in_flight: Arc<watch::Sender<usize>>,
    active_users: Option<Arc<Mutex<HashSet<String>>>>,
) {
    loop {
        let job = { receiver.lock().await.recv().await };
        let Some(job) = job else {
            debug!("Refresh worker {} exiting", worker_id);
            break;
        };

        let user_id = job.user_id.clone();
        let span = info_span!("refresh_job", job_id = %job.id, user_id = %user_id, worker_id);
        let ctx = context.clone();
        // Separate task so a panicking collaborator cannot take the worker down.
        let outcome = tokio::spawn(async move { ctx.process(job).await }.instrument(span)).await;
        if let Err(err) = outcome {
            error!("Refresh job for user {} aborted: {}", user_id, err);
        }

        if let Some(active) = &active_users {
            active.lock().await.remove(&user_id);
        }
        in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}
