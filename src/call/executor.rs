//! # ResilientExecutor: live call with fallback.
//!
//! Composes [`with_timeout`] and [`retry`] around a live operation. When the
//! composed attempt fails for any reason, the executor:
//! 1. emits exactly one [`DegradationEvent`] through its [`DegradationNotifier`],
//! 2. runs the mock operation,
//! 3. falls back to a sentinel value if the mock fails too.
//!
//! The public `execute*` methods never return an error.
//!
//! ## Example
//! ```rust
//! use copilot_core::{CallError, CallOutcome, Config, DegradationNotifier, ResilientExecutor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let exec = ResilientExecutor::new(&Config::default(), DegradationNotifier::default());
//!
//! let outcome = exec
//!     .execute(
//!         || async { Err::<Vec<&str>, _>(CallError::decode("unexpected html body")) },
//!         || async { Ok(vec!["cached contact"]) },
//!     )
//!     .await;
//!
//! assert!(outcome.is_degraded());
//! assert_eq!(outcome.into_inner(), vec!["cached contact"]);
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::call::{CallOutcome, retry, with_timeout};
use crate::config::Config;
use crate::error::CallError;
use crate::events::{DegradationEvent, DegradationNotifier};
use crate::policies::RetryPolicy;

/// Runs live operations with timeout, retry and mock fallback.
///
/// Cheap to clone; clones share the notifier.
#[derive(Clone)]
pub struct ResilientExecutor {
    deadline: Option<Duration>,
    retry: RetryPolicy,
    notifier: DegradationNotifier,
}

impl ResilientExecutor {
    /// Builds an executor from [`Config`] (deadline 10s and 1 retry by default).
    pub fn new(cfg: &Config, notifier: DegradationNotifier) -> Self {
        Self {
            deadline: cfg.deadline(),
            retry: cfg.retry_policy(),
            notifier,
        }
    }

    /// Builds an executor with explicit policies.
    pub fn with_policy(
        deadline: Option<Duration>,
        retry: RetryPolicy,
        notifier: DegradationNotifier,
    ) -> Self {
        Self {
            deadline,
            retry,
            notifier,
        }
    }

    pub fn notifier(&self) -> &DegradationNotifier {
        &self.notifier
    }

    /// Runs only the composed live attempt (timeout + retry), without fallback.
    ///
    /// No degradation is emitted; this is the building block `execute*` use.
    pub async fn try_live<T, L, LF>(&self, mut live: L) -> Result<T, CallError>
    where
        L: FnMut() -> LF,
        LF: Future<Output = Result<T, CallError>>,
    {
        let deadline = self.deadline;
        retry(&self.retry, || with_timeout(deadline, live())).await
    }

    /// Live call with mock fallback; `T::default()` is the last-resort sentinel.
    pub async fn execute<T, L, LF, M, MF>(&self, live: L, mock: M) -> CallOutcome<T>
    where
        T: Default,
        L: FnMut() -> LF,
        LF: Future<Output = Result<T, CallError>>,
        M: FnOnce() -> MF,
        MF: Future<Output = Result<T, CallError>>,
    {
        self.run(None, live, mock, T::default).await
    }

    /// Same as [`execute`](Self::execute), tagging the degradation with `operation`.
    pub async fn execute_named<T, L, LF, M, MF>(
        &self,
        operation: &str,
        live: L,
        mock: M,
    ) -> CallOutcome<T>
    where
        T: Default,
        L: FnMut() -> LF,
        LF: Future<Output = Result<T, CallError>>,
        M: FnOnce() -> MF,
        MF: Future<Output = Result<T, CallError>>,
    {
        self.run(Some(operation), live, mock, T::default).await
    }

    /// Live call with mock fallback and a caller-chosen sentinel.
    ///
    /// `sentinel` is only invoked when both live and mock failed.
    pub async fn execute_with_sentinel<T, L, LF, M, MF, S>(
        &self,
        operation: Option<&str>,
        live: L,
        mock: M,
        sentinel: S,
    ) -> CallOutcome<T>
    where
        L: FnMut() -> LF,
        LF: Future<Output = Result<T, CallError>>,
        M: FnOnce() -> MF,
        MF: Future<Output = Result<T, CallError>>,
        S: FnOnce() -> T,
    {
        self.run(operation, live, mock, sentinel).await
    }

    async fn run<T, L, LF, M, MF, S>(
        &self,
        operation: Option<&str>,
        live: L,
        mock: M,
        sentinel: S,
    ) -> CallOutcome<T>
    where
        L: FnMut() -> LF,
        LF: Future<Output = Result<T, CallError>>,
        M: FnOnce() -> MF,
        MF: Future<Output = Result<T, CallError>>,
        S: FnOnce() -> T,
    {
        let err = match self.try_live(live).await {
            Ok(value) => return CallOutcome::Fresh(value),
            Err(e) => e,
        };

        let mut event = DegradationEvent::from_error(&err);
        if let Some(op) = operation {
            event = event.with_operation(op);
        }
        let reason: Arc<str> = event.reason.clone();
        self.notifier.emit(event);

        match mock().await {
            Ok(value) => CallOutcome::Degraded { value, reason },
            Err(mock_err) => {
                tracing::error!(
                    operation = operation.unwrap_or("unnamed"),
                    live = %err,
                    mock = %mock_err,
                    "live and mock both failed; returning sentinel"
                );
                CallOutcome::Sentinel {
                    value: sentinel(),
                    reason,
                }
            }
        }
    }
}
