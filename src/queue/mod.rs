//! Bounded job queue with per-attempt timeout, retry with exponential
//! backoff, and dead-lettering.
//!
//! # Architecture
//!
//! ```text
//! enqueue(payload) ──admission (backlog limit)──▶ ready channel
//!                                                     │
//!                        ┌────────────┬───────────────┤
//!                        ▼            ▼               ▼
//!                     worker 0     worker 1  …    worker N-1
//!                        │  JobTask::run under attempt timeout
//!                        ├─ ok ─────────────────────────▶ Completed
//!                        ├─ retryable, budget left ─────▶ sleep(backoff) → ready channel
//!                        └─ permanent / exhausted ──────▶ DeadLettered
//! ```
//!
//! Every external engine call in the pipeline is a job on one of these
//! queues, so the worker count of a queue bounds the concurrent calls to its
//! engine.  The job table is the only shared mutable state; it is touched
//! exclusively by the queue.  Callers get a [`JobHandle`] to await or cancel.
//!
//! Dropping a [`JobHandle`] before it resolves cancels its job.  Dropping
//! the [`JobQueue`] stops the workers and resolves every pending handle with
//! [`JobError::QueueClosed`].

pub mod cancel;
pub mod error;
pub mod job;
pub mod policy;

pub use cancel::CancelToken;
pub use error::{JobError, QueueError, TaskError};
pub use job::{JobId, JobReport, JobSnapshot, JobState, QueueJob, QueueStats};
pub use policy::RetryPolicy;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// JobTask
// ---------------------------------------------------------------------------

/// The work a queue performs for each job.
///
/// `run` may be called several times for the same payload (one call per
/// attempt) and may be dropped mid-flight when the attempt times out or the
/// job is cancelled.
#[async_trait]
pub trait JobTask: Send + Sync + 'static {
    type Payload: Send + Sync + 'static;
    type Output: Send + 'static;

    async fn run(&self, payload: &Self::Payload) -> Result<Self::Output, TaskError>;
}

// ---------------------------------------------------------------------------
// QueueSettings
// ---------------------------------------------------------------------------

/// Sizing and retry policy of one queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSettings {
    /// Number of workers, i.e. maximum concurrent `JobTask::run` calls.
    pub workers: usize,
    /// Maximum number of jobs in `Waiting` before enqueue is refused.
    /// Jobs sleeping out a retry backoff are `Waiting` and count here.
    pub max_backlog: usize,
    pub policy: RetryPolicy,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            max_backlog: 64,
            policy: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
impl QueueSettings {
    /// Generous backlog, 3 attempts, 10 ms base backoff, 5 s attempt timeout.
    pub(crate) fn for_tests(workers: usize) -> Self {
        Self {
            workers,
            max_backlog: 64,
            policy: RetryPolicy {
                max_attempts: 3,
                base_delay: std::time::Duration::from_millis(10),
                multiplier: 2.0,
                max_delay: std::time::Duration::from_secs(1),
                attempt_timeout: std::time::Duration::from_secs(5),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Entry<T: JobTask> {
    job: QueueJob<T::Payload>,
    cancel: CancelToken,
    reply: Option<oneshot::Sender<JobReport<T::Output>>>,
}

struct Table<T: JobTask> {
    jobs: HashMap<JobId, Entry<T>>,
    completed: u64,
    failed: u64,
    dead_lettered: u64,
}

impl<T: JobTask> Table<T> {
    fn count(&self, state: JobState) -> usize {
        self.jobs.values().filter(|e| e.job.state == state).count()
    }

    /// Remove a job, bump the terminal counter and deliver its report.
    fn finish(
        &mut self,
        queue: &'static str,
        id: JobId,
        state: JobState,
        outcome: Result<T::Output, JobError>,
    ) {
        let Some(mut entry) = self.jobs.remove(&id) else {
            return;
        };
        match state {
            JobState::Completed => self.completed += 1,
            JobState::DeadLettered => self.dead_lettered += 1,
            _ => self.failed += 1,
        }
        let report = JobReport {
            id,
            state,
            attempts: entry.job.attempts,
            elapsed: entry.job.enqueued_at.elapsed(),
            outcome,
        };
        if let Some(reply) = entry.reply.take() {
            if reply.send(report).is_err() {
                log::debug!("{queue} job {id}: finished after its handle was dropped");
            }
        }
    }
}

struct Inner<T: JobTask> {
    name: &'static str,
    task: T,
    policy: RetryPolicy,
    max_backlog: usize,
    next_id: AtomicU64,
    table: Mutex<Table<T>>,
    ready_tx: mpsc::UnboundedSender<JobId>,
}

impl<T: JobTask> Inner<T> {
    fn table(&self) -> MutexGuard<'_, Table<T>> {
        // The table is never left half-updated, so a poisoned lock is usable.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one attempt of job `id`.
    async fn process(self: Arc<Self>, id: JobId) {
        let (payload, cancel, attempt) = {
            let mut table = self.table();
            let Some(entry) = table.jobs.get_mut(&id) else {
                // Finished while queued (cancelled or shut down).
                return;
            };
            entry.job.state = JobState::Active;
            entry.job.attempts += 1;
            (
                Arc::clone(&entry.job.payload),
                entry.cancel.clone(),
                entry.job.attempts,
            )
        };
        log::debug!("{} job {id}: attempt {attempt} started", self.name);

        let timeout = self.policy.attempt_timeout;
        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            res = tokio::time::timeout(timeout, self.task.run(&payload)) => {
                Some(res.unwrap_or_else(|_elapsed| Err(TaskError::TimedOut(timeout))))
            }
        };

        match outcome {
            None => {
                log::debug!("{} job {id}: cancelled during attempt {attempt}", self.name);
                self.table()
                    .finish(self.name, id, JobState::Failed, Err(JobError::Cancelled));
            }
            Some(Ok(output)) => {
                log::debug!("{} job {id}: completed on attempt {attempt}", self.name);
                self.table()
                    .finish(self.name, id, JobState::Completed, Ok(output));
            }
            Some(Err(error)) => self.on_failure(id, error),
        }
    }

    fn on_failure(self: &Arc<Self>, id: JobId, error: TaskError) {
        let mut table = self.table();
        let Some(entry) = table.jobs.get_mut(&id) else {
            return;
        };
        let attempts = entry.job.attempts;
        let max_attempts = entry.job.max_attempts;
        entry.job.last_error = Some(error.clone());

        if error.is_retryable() && self.policy.allows_retry_after(attempts) {
            entry.job.state = JobState::Waiting;
            drop(table);

            let delay = self.policy.backoff_delay(attempts);
            log::warn!(
                "{} job {id}: attempt {attempts}/{max_attempts} failed ({error}); retrying in {delay:?}",
                self.name
            );
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                inner.requeue(id);
            });
        } else {
            log::warn!(
                "{} job {id}: dead-lettered after {attempts} attempt(s): {error}",
                self.name
            );
            table.finish(
                self.name,
                id,
                JobState::DeadLettered,
                Err(JobError::DeadLettered { attempts, error }),
            );
        }
    }

    fn requeue(&self, id: JobId) {
        if self.ready_tx.send(id).is_err() {
            self.table()
                .finish(self.name, id, JobState::Failed, Err(JobError::QueueClosed));
        }
    }
}

/// Type-erased cancellation entry point held by [`JobHandle`]s.
trait Canceller: Send + Sync {
    fn cancel_job(&self, id: JobId);
}

impl<T: JobTask> Canceller for Inner<T> {
    fn cancel_job(&self, id: JobId) {
        let mut table = self.table();
        let Some(entry) = table.jobs.get(&id) else {
            return;
        };
        match entry.job.state {
            JobState::Waiting => {
                log::debug!("{} job {id}: cancelled while waiting", self.name);
                table.finish(self.name, id, JobState::Failed, Err(JobError::Cancelled));
            }
            // The worker observes the token and abandons the attempt.
            JobState::Active => entry.cancel.cancel(),
            _ => {}
        }
    }
}

async fn worker_loop<T: JobTask>(
    inner: Arc<Inner<T>>,
    ready_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<JobId>>>,
    worker: usize,
) {
    loop {
        let next = ready_rx.lock().await.recv().await;
        let Some(id) = next else {
            break;
        };
        Arc::clone(&inner).process(id).await;
    }
    log::debug!("{} worker {worker}: ready channel closed", inner.name);
}

// ---------------------------------------------------------------------------
// JobQueue
// ---------------------------------------------------------------------------

/// A named queue running one [`JobTask`] on a fixed pool of workers.
pub struct JobQueue<T: JobTask> {
    inner: Arc<Inner<T>>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: JobTask> JobQueue<T> {
    /// Create the queue and spawn its workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(name: &'static str, task: T, settings: QueueSettings) -> Self {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            name,
            task,
            policy: settings.policy,
            max_backlog: settings.max_backlog.max(1),
            next_id: AtomicU64::new(1),
            table: Mutex::new(Table {
                jobs: HashMap::new(),
                completed: 0,
                failed: 0,
                dead_lettered: 0,
            }),
            ready_tx,
        });

        let ready_rx = Arc::new(tokio::sync::Mutex::new(ready_rx));
        let workers = (0..settings.workers.max(1))
            .map(|worker| {
                tokio::spawn(worker_loop(
                    Arc::clone(&inner),
                    Arc::clone(&ready_rx),
                    worker,
                ))
            })
            .collect::<Vec<_>>();

        log::debug!(
            "{name} queue: {} workers, backlog {}",
            workers.len(),
            inner.max_backlog
        );
        Self { inner, workers }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Admit a job.  Never waits: a full backlog fails with
    /// [`QueueError::Saturated`] and the payload is dropped.
    pub fn enqueue(&self, payload: T::Payload) -> Result<JobHandle<T::Output>, QueueError> {
        let inner = &self.inner;
        let (reply_tx, reply_rx) = oneshot::channel();

        let id = {
            let mut table = inner.table();
            if table.count(JobState::Waiting) >= inner.max_backlog {
                log::warn!(
                    "{} queue saturated ({} waiting), rejecting job",
                    inner.name,
                    inner.max_backlog
                );
                return Err(QueueError::Saturated {
                    queue: inner.name,
                    limit: inner.max_backlog,
                });
            }
            let id = JobId(inner.next_id.fetch_add(1, Ordering::Relaxed));
            table.jobs.insert(
                id,
                Entry {
                    job: QueueJob::new(id, payload, inner.policy.max_attempts.max(1)),
                    cancel: CancelToken::new(),
                    reply: Some(reply_tx),
                },
            );
            id
        };

        if inner.ready_tx.send(id).is_err() {
            inner.table().jobs.remove(&id);
            return Err(QueueError::Closed { queue: inner.name });
        }

        let canceller: Arc<dyn Canceller> = Arc::clone(inner) as Arc<dyn Canceller>;
        Ok(JobHandle {
            id,
            reply: reply_rx,
            canceller,
            settled: false,
        })
    }

    /// Current per-state counts.
    pub fn stats(&self) -> QueueStats {
        let table = self.inner.table();
        QueueStats {
            waiting: table.count(JobState::Waiting),
            active: table.count(JobState::Active),
            completed: table.completed,
            failed: table.failed,
            dead_lettered: table.dead_lettered,
        }
    }

    /// Snapshot of a job that has not reached a terminal state yet.
    pub fn job(&self, id: JobId) -> Option<JobSnapshot> {
        self.inner.table().jobs.get(&id).map(|e| e.job.snapshot())
    }
}

impl<T: JobTask> Drop for JobQueue<T> {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
        let mut table = self.inner.table();
        let pending: Vec<JobId> = table.jobs.keys().copied().collect();
        if !pending.is_empty() {
            log::info!(
                "{} queue shutting down with {} unfinished job(s)",
                self.inner.name,
                pending.len()
            );
        }
        for id in pending {
            table.finish(
                self.inner.name,
                id,
                JobState::Failed,
                Err(JobError::QueueClosed),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// JobHandle
// ---------------------------------------------------------------------------

/// Caller-side handle of an enqueued job.
///
/// Dropping the handle before [`wait`](Self::wait) returns cancels the job.
pub struct JobHandle<R> {
    id: JobId,
    reply: oneshot::Receiver<JobReport<R>>,
    canceller: Arc<dyn Canceller>,
    settled: bool,
}

impl<R> JobHandle<R> {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Request cancellation.  A waiting job is finished immediately; an
    /// active job's attempt is abandoned.  Finished jobs are unaffected.
    pub fn cancel(&self) {
        self.canceller.cancel_job(self.id);
    }

    /// Wait until the job reaches a terminal state.
    pub async fn wait(mut self) -> JobReport<R> {
        let report = match (&mut self.reply).await {
            Ok(report) => report,
            Err(_) => JobReport {
                id: self.id,
                state: JobState::Failed,
                attempts: 0,
                elapsed: std::time::Duration::ZERO,
                outcome: Err(JobError::QueueClosed),
            },
        };
        self.settled = true;
        report
    }
}

impl<R> Drop for JobHandle<R> {
    fn drop(&mut self) {
        if !self.settled {
            self.canceller.cancel_job(self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
