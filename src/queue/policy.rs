//! Retry / backoff / timeout policy handed to a [`JobQueue`](super::JobQueue).

use std::time::Duration;

/// Explicit retry policy of one queue.
///
/// Attempt `n` (1-based) that fails with a retryable error is retried after
/// `base_delay * multiplier^(n-1)`, capped at `max_delay`, until
/// `max_attempts` attempts have been made.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first.  Always ≥ 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Time one attempt may take before it is abandoned.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn single_attempt(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            attempt_timeout,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// ```
    /// use std::time::Duration;
    /// use voice_translator::queue::RetryPolicy;
    ///
    /// let p = RetryPolicy::default(); // 500 ms × 2^(n-1), max 10 s
    /// assert_eq!(p.backoff_delay(1), Duration::from_millis(500));
    /// assert_eq!(p.backoff_delay(3), Duration::from_secs(2));
    /// assert_eq!(p.backoff_delay(20), Duration::from_secs(10));
    /// ```
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        // Millisecond resolution keeps the schedule free of float noise.
        let millis = self.base_delay.as_millis() as f64 * self.multiplier.max(1.0).powi(exponent);
        if !millis.is_finite() || millis >= self.max_delay.as_millis() as f64 {
            return self.max_delay;
        }
        Duration::from_millis(millis.round() as u64)
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn allows_retry_after(&self, attempts: u32) -> bool {
        attempts < self.max_attempts.max(1)
    }
}
