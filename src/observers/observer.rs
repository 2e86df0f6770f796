//! # Observer trait.
//!
//! Each registered observer gets:
//! - **Dedicated worker task** (runs independently of the notifier)
//! - **Bounded queue** (capacity via [`Observe::queue_capacity`])
//! - **Panic isolation** (panics are caught and logged)
//!
//! A full queue drops the event for that observer only; other observers and the
//! caller that triggered the degradation are unaffected.

use async_trait::async_trait;

use crate::events::DegradationEvent;

/// Receiver of degradation notifications.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Handles a single degradation event, in FIFO order per observer.
    async fn on_degraded(&self, event: &DegradationEvent);

    /// Name used in logs. Defaults to the type name; override with something short.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue capacity for this observer (clamped to at least 1). Default: 64.
    fn queue_capacity(&self) -> usize {
        64
    }
}
