//! # Runtime configuration.
//!
//! Provides [`Config`] centralized settings for the call layer and the task registry.
//!
//! Config is used in three places:
//! 1. **Executor creation**: `ResilientExecutor::new(&config, notifier)`
//! 2. **Registry creation**: `TaskRegistry::new(&config)`
//! 3. **Backend client**: `BackendClient::new(base, ctx, &config)`
//!
//! ## Sentinel values
//! - `call_timeout = 0s` → no deadline on live calls
//! - `grace = 0s` → terminal tasks are evicted on the next scheduler tick
//!
//! ## Environment
//! [`Config::from_env`] loads a `.env` file (if present) and applies the
//! `COPILOT_*` overrides listed on that method.

use std::time::Duration;

use crate::policies::{BackoffPolicy, JitterPolicy, RetryPolicy};

/// Global configuration for the call layer and the task stream.
///
/// ## Field semantics
/// - `call_timeout`: deadline for one live attempt (`0s` = none)
/// - `retries`: extra live attempts after the first one
/// - `backoff`: delay growth between attempts
/// - `grace`: how long terminal tasks stay visible
/// - `tombstones`: how many evicted terminal ids are remembered
/// - `bus_capacity`: degradation broadcast ring buffer size (min 1)
/// - `request_timeout`: reqwest client-level timeout for plain JSON requests
/// - `connect_timeout`: bound on TCP connect and on waiting for stream response headers
/// - `max_frame_bytes`: largest accepted server-sent event frame
#[derive(Clone, Debug)]
pub struct Config {
    /// Deadline applied to each live attempt.
    pub call_timeout: Duration,

    /// Number of retries after the first live attempt.
    pub retries: u32,

    /// Backoff between live attempts.
    pub backoff: BackoffPolicy,

    /// Grace window before a terminal task is evicted.
    pub grace: Duration,

    /// Capacity of the evicted-id tombstone list.
    pub tombstones: usize,

    /// Capacity of the degradation broadcast channel.
    pub bus_capacity: usize,

    /// Timeout for non-streaming HTTP requests issued by `BackendClient`.
    pub request_timeout: Duration,

    /// Timeout for opening a connection and for the task stream's response headers.
    pub connect_timeout: Duration,

    /// Frames larger than this are dropped by the stream decoder.
    pub max_frame_bytes: usize,
}

impl Config {
    /// Returns the live call deadline as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → deadline applied per attempt
    #[inline]
    pub fn deadline(&self) -> Option<Duration> {
        if self.call_timeout == Duration::ZERO {
            None
        } else {
            Some(self.call_timeout)
        }
    }

    /// Retry policy derived from `retries` and `backoff`.
    #[inline]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.backoff)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Builds a config from defaults, `.env` and process environment.
    ///
    /// Recognized variables (milliseconds unless noted):
    /// - `COPILOT_CALL_TIMEOUT_MS`
    /// - `COPILOT_RETRIES` (count)
    /// - `COPILOT_BACKOFF_MS`
    /// - `COPILOT_GRACE_MS`
    /// - `COPILOT_CONNECT_TIMEOUT_MS`
    /// - `COPILOT_MAX_FRAME_BYTES` (bytes)
    ///
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let read = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!(key, value = %raw, error = %e, "ignoring malformed config value");
                    None
                }
            }
        };

        if let Some(ms) = read("COPILOT_CALL_TIMEOUT_MS") {
            cfg.call_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = read("COPILOT_RETRIES") {
            cfg.retries = n.min(u64::from(u32::MAX)) as u32;
        }
        if let Some(ms) = read("COPILOT_BACKOFF_MS") {
            cfg.backoff.first = Duration::from_millis(ms);
        }
        if let Some(ms) = read("COPILOT_GRACE_MS") {
            cfg.grace = Duration::from_millis(ms);
        }
        if let Some(ms) = read("COPILOT_CONNECT_TIMEOUT_MS") {
            cfg.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = read("COPILOT_MAX_FRAME_BYTES") {
            cfg.max_frame_bytes = usize::try_from(n).unwrap_or(usize::MAX);
        }
        cfg
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `call_timeout = 10s`
    /// - `retries = 1`
    /// - `backoff = 500ms × 1.5, max 30s, no jitter`
    /// - `grace = 5s`
    /// - `tombstones = 1024`
    /// - `bus_capacity = 64`
    /// - `request_timeout = 30s`
    /// - `connect_timeout = 10s`
    /// - `max_frame_bytes = 1 MiB`
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            retries: 1,
            backoff: BackoffPolicy {
                first: Duration::from_millis(500),
                max: Duration::from_secs(30),
                factor: 1.5,
                jitter: JitterPolicy::None,
            },
            grace: Duration::from_secs(5),
            tombstones: 1024,
            bus_capacity: 64,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_frame_bytes: 1024 * 1024,
        }
    }
}
