//! # Degradation observers.
//!
//! This module provides the [`Observe`] trait and the fan-out machinery behind
//! [`DegradationNotifier`](crate::DegradationNotifier).
//!
//! ## Architecture
//! ```text
//! ResilientExecutor ── notify(reason) ──► DegradationNotifier
//!                                              │
//!                                              ├──► Bus (broadcast receivers)
//!                                              │
//!                                              └──► ObserverSet (snapshot)
//!                                                     ├──► [queue] ─► worker ─► banner.on_degraded()
//!                                                     └──► [queue] ─► worker ─► LogObserver
//! ```
//!
//! ## Implementing an observer
//! ```no_run
//! use copilot_core::{DegradationEvent, Observe};
//! use async_trait::async_trait;
//!
//! struct Banner;
//!
//! #[async_trait]
//! impl Observe for Banner {
//!     async fn on_degraded(&self, event: &DegradationEvent) {
//!         // show "working offline: {reason}"
//!         let _ = &event.reason;
//!     }
//!
//!     fn name(&self) -> &'static str { "banner" }
//! }
//! ```

mod log;
mod observer;
mod set;

pub use log::LogObserver;
pub use observer::Observe;
pub(crate) use set::ObserverSet;
