//! Job records, lifecycle states, reports and counters.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use serde::Serialize;

use super::error::{JobError, TaskError};

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// Queue-unique job identifier, allocated sequentially on enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(pub(crate) u64);

impl JobId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Lifecycle of a queue job.
///
/// ```text
/// Waiting ──pickup──▶ Active ──ok──────────────────▶ Completed
///    ▲                  │
///    └──retryable err───┤
///                       ├──exhausted / permanent──▶ DeadLettered
///                       └──cancelled / shutdown───▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    /// Terminal: cancelled by its owner or abandoned on queue shutdown.
    Failed,
    DeadLettered,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::DeadLettered
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::DeadLettered => "dead-lettered",
        }
    }
}

// ---------------------------------------------------------------------------
// QueueJob
// ---------------------------------------------------------------------------

/// The queue's record of one job.  Only the queue mutates it.
#[derive(Debug)]
pub struct QueueJob<P> {
    pub id: JobId,
    pub payload: Arc<P>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub state: JobState,
    pub enqueued_at: Instant,
    pub last_error: Option<TaskError>,
}

impl<P> QueueJob<P> {
    pub(crate) fn new(id: JobId, payload: P, max_attempts: u32) -> Self {
        Self {
            id,
            payload: Arc::new(payload),
            attempts: 0,
            max_attempts,
            state: JobState::Waiting,
            enqueued_at: Instant::now(),
            last_error: None,
        }
    }

    /// Read-only view without the payload.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            state: self.state,
            enqueued_at: self.enqueued_at,
            last_error: self.last_error.clone(),
        }
    }
}

/// Copy of a live job's record, as exposed to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub id: JobId,
    pub attempts: u32,
    pub max_attempts: u32,
    pub state: JobState,
    pub enqueued_at: Instant,
    pub last_error: Option<TaskError>,
}

// ---------------------------------------------------------------------------
// JobReport
// ---------------------------------------------------------------------------

/// Terminal outcome of a job, delivered to whoever awaits its handle.
#[derive(Debug)]
pub struct JobReport<R> {
    pub id: JobId,
    /// `Completed`, `DeadLettered` or `Failed`.
    pub state: JobState,
    /// Attempts actually started.
    pub attempts: u32,
    /// Time from enqueue to the terminal state, backoff included.
    pub elapsed: Duration,
    pub outcome: Result<R, JobError>,
}

impl<R> JobReport<R> {
    pub fn into_result(self) -> Result<R, JobError> {
        self.outcome
    }
}

// ---------------------------------------------------------------------------
// QueueStats
// ---------------------------------------------------------------------------

/// Counts of jobs per state.
///
/// `waiting` and `active` are current gauges; the terminal counts are totals
/// since the queue was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: u64,
    /// Jobs cancelled or cut off by shutdown.  Excludes `dead_lettered`.
    pub failed: u64,
    pub dead_lettered: u64,
}

impl QueueStats {
    /// Every job that ended without an output: dead-lettered, cancelled or
    /// shut down.
    pub fn failed_total(&self) -> u64 {
        self.failed + self.dead_lettered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_waiting_with_no_attempts() {
        let job = QueueJob::new(JobId(7), "payload", 3);
        assert_eq!(job.state, JobState::Waiting);
        assert_eq!(job.attempts, 0);
        assert!(job.last_error.is_none());

        let snap = job.snapshot();
        assert_eq!(snap.id, JobId(7));
        assert_eq!(snap.max_attempts, 3);
    }

    #[test]
    fn terminal_states() {
        assert!(!JobState::Waiting.is_terminal());
        assert!(!JobState::Active.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::DeadLettered.is_terminal());
    }

    #[test]
    fn job_id_display() {
        assert_eq!(JobId(42).to_string(), "#42");
    }

    #[test]
    fn stats_serialize_as_flat_object() {
        let stats = QueueStats {
            waiting: 1,
            active: 2,
            completed: 3,
            failed: 0,
            dead_lettered: 1,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["active"], 2);
        assert_eq!(json["dead_lettered"], 1);
    }
}
