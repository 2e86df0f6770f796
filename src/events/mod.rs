//! Degradation events: payload, broadcast bus and notifier.
//!
//! ## Contents
//! - [`DegradationEvent`] payload (reason, operation, error label, seq)
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//! - [`DegradationNotifier`] observer registry + bus, owned by whoever builds the executor
//!
//! ## Quick reference
//! - **Publisher**: `ResilientExecutor`, once per failed live call.
//! - **Consumers**: [`Observe`](crate::Observe) implementations (banner, [`LogObserver`](crate::LogObserver))
//!   and broadcast receivers from [`DegradationNotifier::subscribe`].

mod bus;
mod event;
mod notifier;

pub use bus::Bus;
pub use event::DegradationEvent;
pub use notifier::{DegradationNotifier, Subscription};
