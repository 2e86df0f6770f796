//! # Broadcast bus for degradation events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] for consumers that
//! prefer pulling events (`recv().await`) over implementing [`Observe`](crate::Observe),
//! e.g. a banner component polling in its own task.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and never fails.
//! - **No persistence**: events are lost if there are no receivers at send time.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` items.

use tokio::sync::broadcast;

use super::event::DegradationEvent;

/// Broadcast channel for degradation events.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<DegradationEvent>,
}

impl Bus {
    /// Creates a bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes to all current receivers; dropped if there are none.
    pub fn publish(&self, ev: DegradationEvent) {
        let _ = self.tx.send(ev);
    }

    /// New receiver observing events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DegradationEvent> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_receivers_miss_earlier_events() {
        let bus = Bus::new(0);
        bus.publish(DegradationEvent::new("before"));

        let mut rx = bus.subscribe();
        bus.publish(DegradationEvent::new("after"));

        let got = rx.recv().await.unwrap();
        assert_eq!(&*got.reason, "after");
        assert!(rx.try_recv().is_err());
    }
}
