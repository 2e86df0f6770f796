//! # copilot-core
//!
//! **copilot-core** is the resilient call layer and task-lifecycle tracker of the
//! CRM copilot front-end.
//!
//! It provides two building blocks:
//! - a [`ResilientExecutor`] that runs a *live* call under a deadline, retries it
//!   with backoff, and falls back to a *mock* call (then a sentinel) while
//!   broadcasting a [`DegradationEvent`]; the caller always receives a value;
//! - a [`TaskRegistry`] fed by a server-sent event stream, holding backend tasks
//!   under a forward-only state machine with scheduled eviction.
//!
//! ## Architecture
//! ### Calls
//! ```text
//!   UI action
//!      │
//!      ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ ResilientExecutor                                                │
//! │   retry(RetryPolicy, || with_timeout(deadline, live()))          │
//! │      ├─ Ok  ───────────────────────────────► CallOutcome::Fresh  │
//! │      └─ Err ─► DegradationNotifier::emit ─► mock()               │
//! │                     │                      ├─ Ok  ► Degraded     │
//! │                     │                      └─ Err ► Sentinel     │
//! └─────────────────────┼────────────────────────────────────────────┘
//!                       ▼
//!        ┌──────────────┴──────────────┐
//!        ▼                             ▼
//!   Bus (broadcast)            ObserverSet (per-observer queues)
//!   banner receivers            worker ─► Observe::on_degraded()
//! ```
//!
//! ### Tasks
//! ```text
//! BackendClient ──► GET /tasks/stream ──► TaskStream::run()
//!                                             │ SseDecoder ─► StreamEvent
//!                                             ▼
//!                                       TaskRegistry::apply()
//!                                             │ queued → running → done|failed
//!                                             ├─► RegistryChange (broadcast)
//!                                             └─► eviction after grace window
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types                                   |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Calls**         | Timeout, retry and mock fallback; never returns an error.    | [`ResilientExecutor`], [`CallOutcome`]      |
//! | **Policies**      | Retry budget and backoff shape.                              | [`RetryPolicy`], [`BackoffPolicy`]          |
//! | **Degradation**   | Explicit publish/subscribe hub with detach handles.          | [`DegradationNotifier`], [`Observe`]        |
//! | **Tasks**         | Monotonic, idempotent task store.                            | [`TaskRegistry`], [`TaskRecord`]            |
//! | **Stream**        | SSE consumer, one connection per (base, tenant).             | [`TaskStreamClient`], [`StreamHub`]         |
//! | **Backend**       | JSON client carrying tenant, role and preview headers.       | [`BackendClient`], [`CallContext`]          |
//! | **Errors**        | Typed errors with stable log labels.                         | [`CallError`], [`StreamError`]              |
//! | **Configuration** | Defaults with `.env` / environment overrides.                | [`Config`]                                  |
//!
//! ## Example
//! ```rust
//! use copilot_core::{CallError, Config, DegradationNotifier, ResilientExecutor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cfg = Config::default();
//!     let notifier = DegradationNotifier::from_config(&cfg);
//!     let mut banner = notifier.subscribe();
//!
//!     let exec = ResilientExecutor::new(&cfg, notifier);
//!     let deals = exec
//!         .execute_named(
//!             "deals.list",
//!             || async { Err::<Vec<String>, _>(CallError::decode("gateway returned html")) },
//!             || async { Ok(vec!["Acme renewal".to_string()]) },
//!         )
//!         .await;
//!
//!     assert!(deals.is_degraded());
//!     let ev = banner.try_recv().unwrap();
//!     assert_eq!(ev.operation.as_deref(), Some("deals.list"));
//! }
//! ```

mod backend;
mod call;
mod config;
mod context;
mod error;
mod events;
mod observers;
mod policies;
mod stream;
mod tasks;

// ---- Public re-exports ----

pub use backend::BackendClient;
pub use call::{CallOutcome, ResilientExecutor, retry, with_timeout};
pub use config::Config;
pub use context::{ActorRole, CallContext, PREVIEW_HEADER, ROLE_HEADER, TENANT_HEADER};
pub use error::{CallError, ContextError, StreamError};
pub use events::{Bus, DegradationEvent, DegradationNotifier, Subscription};
pub use observers::{LogObserver, Observe};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use stream::{
    HEARTBEAT_EVENT, STATUS_EVENT, SseDecoder, SseFrame, StreamEnd, StreamEvent, StreamHub,
    StreamSession, StreamStats, TaskStream, TaskStreamClient,
};
pub use tasks::{
    Applied, ChangeKind, IgnoreReason, RegistryChange, TaskRecord, TaskRegistry, TaskSnapshot,
    TaskStatus,
};
