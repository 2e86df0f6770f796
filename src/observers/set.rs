//! # ObserverSet: dynamic, non-blocking fan-out.
//!
//! [`ObserverSet`] keeps one bounded queue and one worker task per attached
//! observer. Observers can be attached and detached at any time, including while
//! an emission is in progress.
//!
//! ## Rules
//! - `emit()` snapshots the channel list first, then delivers without holding the lock.
//! - Per-observer FIFO; no ordering across observers.
//! - Queue full or closed: the event is dropped for that observer and a warning is logged.
//! - Detaching drops the sender; the worker drains what is queued and exits.
//! - Panics inside `on_degraded` are caught; the worker keeps running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::events::DegradationEvent;

use super::Observe;

/// Per-observer queue with metadata.
struct ObserverChannel {
    id: u64,
    name: &'static str,
    sender: mpsc::Sender<Arc<DegradationEvent>>,
}

/// Fan-out over a mutable list of observers.
pub(crate) struct ObserverSet {
    channels: RwLock<Vec<Arc<ObserverChannel>>>,
    next_id: AtomicU64,
}

impl ObserverSet {
    pub(crate) fn new() -> Self {
        Self {
            channels: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Spawns a worker for `observer` and returns its id.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn attach(&self, observer: Arc<dyn Observe>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = observer.name();
        let (tx, mut rx) = mpsc::channel::<Arc<DegradationEvent>>(observer.queue_capacity().max(1));

        tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let fut = observer.on_degraded(ev.as_ref());
                if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    let info = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                        (*msg).to_string()
                    } else if let Some(msg) = panic.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "unknown panic".to_string()
                    };
                    tracing::error!(observer = observer.name(), %info, "observer panicked");
                }
            }
        });

        let channel = Arc::new(ObserverChannel {
            id,
            name,
            sender: tx,
        });
        self.channels
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(channel);
        id
    }

    /// Removes the observer with `id`. Returns `false` if it was already gone.
    pub(crate) fn detach(&self, id: u64) -> bool {
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        let before = channels.len();
        channels.retain(|c| c.id != id);
        channels.len() != before
    }

    /// Delivers `event` to every observer attached at the time of the call.
    pub(crate) fn emit(&self, event: Arc<DegradationEvent>) {
        let snapshot: Vec<Arc<ObserverChannel>> = self
            .channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for channel in snapshot {
            match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(observer = channel.name, "observer dropped event: queue full");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(observer = channel.name, "observer dropped event: worker closed");
                }
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.channels.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
