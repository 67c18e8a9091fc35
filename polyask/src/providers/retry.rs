//! Attempt bookkeeping and exponential backoff for provider calls.

use std::time::Duration;

/// Exponent cap so the doubling cannot overflow.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    base.saturating_mul(1u32 << exponent)
}

/// Attempt counter for one executor invocation.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    base_backoff: Duration,
}

impl RetryState {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Start the next attempt and return its 1-based number, or `None` when
    /// the budget is spent.
    pub fn begin(&mut self) -> Option<u32> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(self.attempt)
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff to sleep after the current attempt failed, or `None` if it was
    /// the last one.
    pub fn next_backoff(&self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            None
        } else {
            Some(backoff_delay(self.base_backoff, self.attempt))
        }
    }
}
