//! Bounded retry policy for the OCR pipeline.

use std::time::Duration;

/// Fixed-backoff retry budget.
///
/// `max_attempts` counts every pipeline run, including the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(60);

    pub fn new(max_attempts: i32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Whether another attempt may start after `attempts_made` attempts.
    pub fn allows_another(&self, attempts_made: i32) -> bool {
        attempts_made < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}
