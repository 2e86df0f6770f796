//! # Degradation notifier.
//!
//! [`DegradationNotifier`] is an explicitly constructed publish/subscribe hub. It is
//! cheap to clone; clones share observers, bus and sequence counter.
//!
//! Two ways to listen:
//! - [`register`](DegradationNotifier::register) an [`Observe`] implementation and keep the
//!   returned [`Subscription`]; dropping it detaches the observer.
//! - [`subscribe`](DegradationNotifier::subscribe) for a broadcast receiver.
//!
//! Emission is fire-and-forget: no acknowledgment, nothing replayed to late
//! listeners, and no failure when nobody is listening.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::broadcast;

use crate::config::Config;
use crate::events::{Bus, DegradationEvent};
use crate::observers::{Observe, ObserverSet};

struct Inner {
    bus: Bus,
    observers: Arc<ObserverSet>,
    seq: AtomicU64,
}

/// Broadcast hub for degradation events.
#[derive(Clone)]
pub struct DegradationNotifier {
    inner: Arc<Inner>,
}

impl DegradationNotifier {
    /// Creates a notifier whose broadcast ring holds `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                bus: Bus::new(capacity),
                observers: Arc::new(ObserverSet::new()),
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a notifier sized from [`Config::bus_capacity`].
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.bus_capacity_clamped())
    }

    /// Attaches an observer until the returned handle is dropped.
    ///
    /// Must be called from within a tokio runtime (spawns the observer's worker).
    pub fn register(&self, observer: Arc<dyn Observe>) -> Subscription {
        let id = self.inner.observers.attach(observer);
        Subscription {
            id: Some(id),
            observers: Arc::downgrade(&self.inner.observers),
        }
    }

    /// Receiver for events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DegradationEvent> {
        self.inner.bus.subscribe()
    }

    /// Emits a degradation with just a reason.
    pub fn notify(&self, reason: impl Into<Arc<str>>) -> u64 {
        self.emit(DegradationEvent::new(reason))
    }

    /// Stamps `event` with the next sequence number and delivers it.
    ///
    /// Returns the assigned sequence number.
    pub fn emit(&self, event: DegradationEvent) -> u64 {
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let event = event.with_seq(seq);
        tracing::debug!(seq, reason = %event.reason, "degradation emitted");

        self.inner.observers.emit(Arc::new(event.clone()));
        self.inner.bus.publish(event);
        seq
    }

    /// Number of registered observers (broadcast receivers not included).
    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }
}

impl Default for DegradationNotifier {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Registration handle returned by [`DegradationNotifier::register`].
///
/// Dropping it detaches the observer.
#[must_use = "dropping a Subscription detaches the observer immediately"]
pub struct Subscription {
    id: Option<u64>,
    observers: Weak<ObserverSet>,
}

impl Subscription {
    /// Detaches the observer now.
    pub fn unregister(mut self) {
        self.detach();
    }

    /// Keeps the observer attached for the notifier's whole lifetime.
    pub fn keep(mut self) {
        self.id = None;
    }

    fn detach(&mut self) {
        if let (Some(id), Some(set)) = (self.id.take(), self.observers.upgrade()) {
            set.detach(id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
