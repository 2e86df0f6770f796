//! # Timeout wrapper for a single live attempt.
//!
//! Races the operation against a deadline. Whichever settles first wins:
//!
//! ```text
//! with_timeout(Some(10s), op)
//!   ├─ op settles first       → op's result
//!   └─ deadline fires first   → Err(CallError::Timeout { timeout: 10s })
//!                               (op future dropped, never awaited further)
//! ```
//!
//! `None` or a zero duration disables the deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::error::CallError;

/// Awaits `op` for at most `deadline`.
pub async fn with_timeout<T, F>(deadline: Option<Duration>, op: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, CallError>>,
{
    match deadline.filter(|d| *d > Duration::ZERO) {
        Some(dur) => match time::timeout(dur, op).await {
            Ok(res) => res,
            Err(_elapsed) => Err(CallError::Timeout { timeout: dur }),
        },
        None => op.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn near(actual: Duration, expected: Duration) -> bool {
        actual >= expected && actual < expected + Duration::from_millis(5)
    }

    #[tokio::test(start_paused = true)]
    async fn slow_operation_times_out_at_deadline() {
        let started = Instant::now();
        let res: Result<u32, _> = with_timeout(Some(Duration::from_secs(10)), async {
            time::sleep(Duration::from_secs(15)).await;
            Ok(7)
        })
        .await;

        assert!(matches!(res, Err(CallError::Timeout { timeout }) if timeout == Duration::from_secs(10)));
        assert!(near(started.elapsed(), Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_operation_wins() {
        let res = with_timeout(Some(Duration::from_secs(10)), async {
            time::sleep(Duration::from_secs(3)).await;
            Ok::<_, CallError>("live")
        })
        .await;
        assert_eq!(res.unwrap(), "live");
    }

    #[tokio::test(start_paused = true)]
    async fn operation_error_passes_through() {
        let res: Result<(), _> =
            with_timeout(Some(Duration::from_secs(1)), async { Err(CallError::transport("refused")) }).await;
        assert!(matches!(res, Err(CallError::Transport { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_deadline_waits_for_completion() {
        let started = Instant::now();
        let res = with_timeout(Some(Duration::ZERO), async {
            time::sleep(Duration::from_secs(60)).await;
            Ok::<_, CallError>(1)
        })
        .await;
        assert_eq!(res.unwrap(), 1);
        assert!(near(started.elapsed(), Duration::from_secs(60)));
    }
}
