//! # Retry budget for live calls.
//!
//! [`RetryPolicy`] pairs a retry count with a [`BackoffPolicy`]. `retries = 0`
//! means a single attempt and no delay; `retries = n` allows up to `n + 1`
//! strictly sequential attempts.

use std::time::Duration;

use crate::policies::backoff::BackoffPolicy;

/// Bounded retry policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay growth between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    /// One retry with [`BackoffPolicy::default`].
    fn default() -> Self {
        Self {
            retries: 1,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: BackoffPolicy) -> Self {
        Self { retries, backoff }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    /// Total attempts allowed (`retries + 1`, saturating).
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay before `attempt` (1-based). The first attempt never waits.
    #[inline]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.backoff.next(attempt - 2)
        }
    }
}
