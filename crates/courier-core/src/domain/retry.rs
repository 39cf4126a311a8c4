//! Retry policy: decides backoff delays between task attempts.

use std::time::Duration;

/// Retry policy for failed tasks.
///
/// The orchestration engine owns retries; workers only report retryable vs.
/// non-retryable failures. `maximum_attempts == 0` means unlimited.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_interval: Duration,

    /// Multiplier applied per attempt.
    pub backoff_coefficient: f64,

    /// Upper bound for a single delay.
    pub maximum_interval: Option<Duration>,

    /// Total attempts allowed, including the first one.
    pub maximum_attempts: u32,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            maximum_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_maximum_attempts(mut self, attempts: u32) -> Self {
        self.maximum_attempts = attempts;
        self
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Whether attempt number `attempt` (1-indexed) may run.
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.maximum_attempts == 0 || attempt <= self.maximum_attempts
    }

    /// Delay before the retry that follows `attempts` failed attempts.
    ///
    /// delay = initial_interval * backoff_coefficient^(attempts - 1), capped at
    /// `maximum_interval`.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
        match self.maximum_interval {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Some(Duration::from_secs(100)),
            maximum_attempts: 0,
        }
    }
}
