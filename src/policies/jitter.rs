//! # Jitter for retry delays.
//!
//! Many front-end sessions hitting the same unhealthy backend would otherwise retry
//! in lockstep. [`JitterPolicy`] spreads those retries out.
//!
//! - [`JitterPolicy::None`]: exact delay (default; keeps delays strictly increasing)
//! - [`JitterPolicy::Full`]: uniform in `[0, delay]`
//! - [`JitterPolicy::Equal`]: `delay/2 + uniform[0, delay/2]`
//! - [`JitterPolicy::Decorrelated`]: uniform in `[base, 3 × delay]`, capped at max
//!
//! `Decorrelated` is stateless: it spreads around the computed delay of the current
//! retry, not the previous randomized delay. Successive draws are independent, so it
//! behaves as bounded random jitter with a floor at `base`.

use rand::Rng;
use std::time::Duration;

/// Randomization strategy applied to a computed backoff delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the computed delay unchanged.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// Half fixed, half random.
    Equal,
    /// Bounded random jitter, uniform in `[base, 3 × delay]` where `delay` is this
    /// retry's computed delay (no previous-delay state is kept).
    ///
    /// Needs [`apply_decorrelated`](Self::apply_decorrelated).
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter to `delay`.
    ///
    /// `Decorrelated` returns `delay` unchanged here; it needs the base and cap.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis() as u64;
        match self {
            JitterPolicy::None | JitterPolicy::Decorrelated => delay,
            JitterPolicy::Full if ms == 0 => Duration::ZERO,
            JitterPolicy::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                let spread = if half == 0 {
                    0
                } else {
                    rand::rng().random_range(0..=half)
                };
                Duration::from_millis(half + spread)
            }
        }
    }

    /// Decorrelated jitter with its full context.
    ///
    /// Falls back to [`apply`](Self::apply) on `delay` for other variants.
    pub fn apply_decorrelated(&self, base: Duration, delay: Duration, max: Duration) -> Duration {
        if !matches!(self, JitterPolicy::Decorrelated) {
            return self.apply(delay);
        }

        let base_ms = base.as_millis() as u64;
        let upper = (delay.as_millis() as u64)
            .saturating_mul(3)
            .min(max.as_millis() as u64)
            .max(base_ms);

        if base_ms >= upper {
            return base;
        }
        Duration::from_millis(rand::rng().random_range(base_ms..=upper))
    }
}
