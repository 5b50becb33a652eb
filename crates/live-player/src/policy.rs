//! Bounded fixed-delay retry policy.
//!
//! The controller keeps two independent counters built from this policy:
//!
//! | Counter     | Purpose                              | Max | Delay |
//! |-------------|--------------------------------------|-----|-------|
//! | `waiting`   | stream not yet available / net blip  | 10  | 5s    |
//! | `reconnect` | full pipeline teardown and reload    | 5   | 3s    |
//!
//! There is no exponential backoff here; every retry waits the same delay.

use std::time::Duration;

/// Default soft-wait budget.
pub const DEFAULT_WAIT_MAX_ATTEMPTS: u32 = 10;

/// Default soft-wait delay.
pub const DEFAULT_WAIT_DELAY: Duration = Duration::from_secs(5);

/// Default hard-reconnect budget.
pub const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 5;

/// Default hard-reconnect delay.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Maximum attempts and the fixed delay between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Soft-wait policy: 10 attempts, 5 seconds apart.
    #[must_use]
    pub const fn waiting() -> Self {
        Self::new(DEFAULT_WAIT_MAX_ATTEMPTS, DEFAULT_WAIT_DELAY)
    }

    /// Hard-reconnect policy: 5 attempts, 3 seconds apart.
    #[must_use]
    pub const fn reconnect() -> Self {
        Self::new(DEFAULT_RECONNECT_MAX_ATTEMPTS, DEFAULT_RECONNECT_DELAY)
    }
}

/// A mutable attempt counter governed by a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryCounter {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryCounter {
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Attempts consumed so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Whether another attempt would exceed the budget.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    /// Consume one attempt.
    ///
    /// Returns the delay to wait before the attempt, or `None` when the
    /// budget is exhausted. An exhausted counter is left untouched.
    pub fn try_consume(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.policy.delay)
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
