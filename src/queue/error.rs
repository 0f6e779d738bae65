//! Queue error types: admission, per-attempt and terminal job failures.

use std::time::Duration;

use thiserror::Error;

use crate::ports::PortError;

// ---------------------------------------------------------------------------
// QueueError: admission
// ---------------------------------------------------------------------------

/// Returned synchronously by [`JobQueue::enqueue`](super::JobQueue::enqueue).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The backlog of waiting jobs is full; the job was not admitted.
    #[error("{queue} queue saturated: {limit} jobs already waiting")]
    Saturated { queue: &'static str, limit: usize },

    /// The queue's workers are gone.
    #[error("{queue} queue is closed")]
    Closed { queue: &'static str },
}

// ---------------------------------------------------------------------------
// TaskError: a single failed attempt
// ---------------------------------------------------------------------------

/// Failure of one attempt of a job.
///
/// [`TaskError::is_retryable`] decides whether the queue backs off and tries
/// again or dead-letters the job straight away.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    /// The engine port reported an error; retryability follows
    /// [`PortError::is_retryable`].
    #[error(transparent)]
    Port(#[from] PortError),

    /// The attempt exceeded the per-attempt timeout and was abandoned.
    #[error("attempt timed out after {0:?}")]
    TimedOut(Duration),

    /// The task rejected its input; retrying cannot help.
    #[error("{0}")]
    Permanent(String),
}

impl TaskError {
    pub fn is_retryable(&self) -> bool {
        match self {
            TaskError::Port(e) => e.is_retryable(),
            TaskError::TimedOut(_) => true,
            TaskError::Permanent(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// JobError: terminal failure surfaced to the awaiting caller
// ---------------------------------------------------------------------------

/// Why a job did not complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    /// Attempts were exhausted, or the error was non-retryable.
    #[error("dead-lettered after {attempts} attempt(s): {error}")]
    DeadLettered { attempts: u32, error: TaskError },

    /// The job was cancelled by its owner before it finished.
    #[error("job cancelled")]
    Cancelled,

    /// The queue was shut down before the job finished.
    #[error("job queue shut down")]
    QueueClosed,
}

impl JobError {
    /// The error of the last attempt, when the job was dead-lettered.
    pub fn last_error(&self) -> Option<&TaskError> {
        match self {
            JobError::DeadLettered { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_retryable() {
        assert!(TaskError::TimedOut(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn permanent_is_not_retryable() {
        assert!(!TaskError::Permanent("malformed".into()).is_retryable());
    }

    #[test]
    fn port_errors_keep_their_classification() {
        assert!(TaskError::from(PortError::RateLimited).is_retryable());
        assert!(!TaskError::from(PortError::InvalidInput("x".into())).is_retryable());
    }

    #[test]
    fn dead_letter_display_names_attempts_and_cause() {
        let e = JobError::DeadLettered {
            attempts: 3,
            error: TaskError::Port(PortError::Timeout),
        };
        assert_eq!(
            e.to_string(),
            "dead-lettered after 3 attempt(s): engine request timed out"
        );
        assert_eq!(e.last_error(), Some(&TaskError::Port(PortError::Timeout)));
    }

    #[test]
    fn saturated_display() {
        let e = QueueError::Saturated {
            queue: "translation",
            limit: 8,
        };
        assert_eq!(
            e.to_string(),
            "translation queue saturated: 8 jobs already waiting"
        );
    }
}
