//! # Backoff between live call attempts.
//!
//! [`BackoffPolicy`] computes the wait before each retry of a live call.
//! The delay before retry `n` (0-indexed) is `first × factor^n`, clamped to `max`,
//! then jittered. The base is derived from the retry index alone, so jitter never
//! compounds across retries.
//!
//! With the default `factor = 1.5` and no jitter the delays are strictly
//! increasing until the cap is reached:
//!
//! ```rust
//! use std::time::Duration;
//! use copilot_core::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::default();
//! assert_eq!(backoff.next(0), Duration::from_millis(500));
//! assert_eq!(backoff.next(1), Duration::from_millis(750));
//! assert_eq!(backoff.next(2), Duration::from_millis(1125));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Default multiplicative growth between retries.
pub const DEFAULT_FACTOR: f64 = 1.5;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Multiplicative growth factor (`> 1.0` for increasing delays).
    pub factor: f64,
    /// Randomization applied on top of the computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 500ms`, `factor = 1.5`, `max = 30s`, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: DEFAULT_FACTOR,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Constant delay of `every`, useful in tests and for polling endpoints.
    pub fn constant(every: Duration) -> Self {
        Self {
            first: every,
            max: every,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Delay to wait before retry number `retry` (0-indexed).
    ///
    /// Overflowing or non-finite products clamp to `max`.
    pub fn next(&self, retry: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = retry.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };

        match self.jitter {
            // stateless: bounded by this retry's delay, not the previous draw
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(first_ms: u64, max: Duration, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max,
            factor,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn default_grows_by_half() {
        let policy = BackoffPolicy::default();
        let delays: Vec<_> = (0..4).map(|n| policy.next(n)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(750),
                Duration::from_millis(1125),
                Duration::from_micros(1_687_500),
            ]
        );
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn constant_never_grows() {
        let policy = BackoffPolicy::constant(Duration::from_millis(200));
        for n in 0..8 {
            assert_eq!(policy.next(n), Duration::from_millis(200));
        }
    }

    #[test]
    fn capped_at_max() {
        let policy = plain(100, Duration::from_secs(1), 2.0);
        assert_eq!(policy.next(10), Duration::from_secs(1));
    }

    #[test]
    fn first_above_max_is_clamped() {
        let policy = plain(10_000, Duration::from_secs(5), 2.0);
        assert_eq!(policy.next(0), Duration::from_secs(5));
    }

    #[test]
    fn overflow_clamps_to_max() {
        let policy = plain(100, Duration::from_secs(10), 2.0);
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn equal_jitter_stays_in_upper_half() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Equal,
            ..plain(1000, Duration::from_secs(30), 1.0)
        };
        for n in 0..32 {
            let d = policy.next(n);
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn decorrelated_respects_floor_and_cap() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Decorrelated,
            ..plain(100, Duration::from_secs(3), 2.0)
        };
        for _ in 0..64 {
            let d = policy.next(6);
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_secs(3));
        }
    }
}
