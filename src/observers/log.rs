//! # LogObserver: degradation events to `tracing`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! WARN copilot_core::observers::log: serving fallback data seq=3 operation="contacts.list" label="call_timeout" reason="retries exhausted after 2 attempts: timed out after 10s"
//! ```

use async_trait::async_trait;

use crate::events::DegradationEvent;
use crate::observers::Observe;

/// Observer that writes every degradation through `tracing::warn!`.
#[derive(Default)]
pub struct LogObserver;

impl LogObserver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogObserver {
    async fn on_degraded(&self, e: &DegradationEvent) {
        tracing::warn!(
            seq = e.seq,
            operation = e.operation.as_deref().unwrap_or("unnamed"),
            label = e.label.unwrap_or("unknown"),
            reason = %e.reason,
            "serving fallback data"
        );
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
