//! Resilient call layer.
//!
//! ## Composition
//! ```text
//! ResilientExecutor::execute(live, mock)
//!   │
//!   ├─► retry(policy, || with_timeout(deadline, live()))
//!   │       attempt 1 ─► Err ─► sleep(backoff.next(0)) ─► attempt 2 ─► ...
//!   │       │
//!   │       ├─ Ok(v)  ─────────────────────────────────► CallOutcome::Fresh(v)
//!   │       └─ Err(e) ─► notifier.emit(e)   (exactly once)
//!   │                      └─► mock()
//!   │                            ├─ Ok(v)  ────────────► CallOutcome::Degraded { v, reason }
//!   │                            └─ Err(_) ────────────► CallOutcome::Sentinel { sentinel, reason }
//!   └─ never returns an error
//! ```
//!
//! ## Rules
//! - Attempts are strictly sequential; backoff sleeps are never parallelized.
//! - A timed-out attempt's future is dropped; work it already spawned elsewhere may
//!   still finish and is ignored.
//! - One degradation notification per failed `execute*` call, never per retry.

mod executor;
mod outcome;
mod retry;
mod timeout;

pub use executor::ResilientExecutor;
pub use outcome::CallOutcome;
pub use retry::retry;
pub use timeout::with_timeout;
