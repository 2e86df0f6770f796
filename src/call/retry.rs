//! # Sequential retry loop.
//!
//! ```text
//! loop {
//!   ├─► attempt += 1
//!   ├─► op().await
//!   │     ├─ Ok(v)                      ─► return Ok(v)
//!   │     ├─ Err(non-retryable)         ─► return Err(e)
//!   │     └─ Err(retryable):
//!   │          ├─ attempt == max        ─► return RetryExhausted { attempts, last }
//!   │          └─ sleep(backoff.next(attempt - 1)), continue
//! }
//! ```
//!
//! The next attempt is created only after the previous one settled and its
//! backoff elapsed.

use std::future::Future;

use tokio::time;

use crate::error::CallError;
use crate::policies::RetryPolicy;

/// Runs `op` until it succeeds, fails fatally, or `policy` is exhausted.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CallError>>,
{
    let max = policy.max_attempts();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let err = match op().await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };

        if !err.is_retryable() {
            tracing::debug!(attempt, error = %err, "non-retryable failure");
            return Err(err);
        }
        if attempt >= max {
            return Err(CallError::RetryExhausted {
                attempts: attempt,
                last: Box::new(err),
            });
        }

        let delay = policy.delay_before(attempt + 1);
        tracing::debug!(attempt, ?delay, label = err.as_label(), "attempt failed; backing off");
        time::sleep(delay).await;
    }
}
