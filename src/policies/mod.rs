//! Retry and backoff policies for live calls.
//!
//! This module groups the knobs that control **how many times** a live call is
//! attempted and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RetryPolicy`]   retry budget plus backoff (defaults: 1 retry)
//! - [`BackoffPolicy`] how delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  optional randomization of the computed delay
//!
//! ## Quick wiring
//! ```text
//! Config { retries, backoff }
//!      └─► Config::retry_policy() ─► call::retry(policy, op)
//!           - attempt 0 runs immediately
//!           - attempt n>0 waits backoff.next(n-1) first
//! ```
//!
//! ## Defaults
//! - `RetryPolicy::default()` → 1 retry.
//! - `BackoffPolicy::default()` → first=500ms, factor=1.5, max=30s, jitter=None.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
