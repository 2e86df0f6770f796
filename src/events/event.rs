//! # Degradation events.
//!
//! A [`DegradationEvent`] is emitted once per failed live call, right before the
//! executor falls back to the mock operation. It carries a human-readable reason
//! plus optional metadata for logs.
//!
//! ## Ordering
//! The [`DegradationNotifier`](crate::DegradationNotifier) stamps every event with
//! a per-notifier sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use copilot_core::DegradationEvent;
//!
//! let ev = DegradationEvent::new("backend unavailable")
//!     .with_operation("contacts.list")
//!     .with_label("call_timeout");
//!
//! assert_eq!(&*ev.reason, "backend unavailable");
//! assert_eq!(ev.operation.as_deref(), Some("contacts.list"));
//! ```

use std::sync::Arc;
use std::time::SystemTime;

use crate::error::CallError;

/// Notification that fallback data is being served instead of live data.
#[derive(Clone, Debug)]
pub struct DegradationEvent {
    /// Sequence number assigned by the notifier (0 until emitted).
    pub seq: u64,
    /// Wall-clock timestamp of creation.
    pub at: SystemTime,
    /// Human-readable reason.
    pub reason: Arc<str>,
    /// Name of the degraded operation, if the caller provided one.
    pub operation: Option<Arc<str>>,
    /// Stable error label (see [`CallError::as_label`]).
    pub label: Option<&'static str>,
}

impl DegradationEvent {
    /// Creates an event with the given reason and the current timestamp.
    pub fn new(reason: impl Into<Arc<str>>) -> Self {
        Self {
            seq: 0,
            at: SystemTime::now(),
            reason: reason.into(),
            operation: None,
            label: None,
        }
    }

    /// Builds an event from the failure that triggered the fallback.
    pub fn from_error(err: &CallError) -> Self {
        Self::new(err.to_string()).with_label(err.root().as_label())
    }

    /// Attaches the operation name.
    #[inline]
    pub fn with_operation(mut self, op: impl Into<Arc<str>>) -> Self {
        self.operation = Some(op.into());
        self
    }

    /// Attaches a stable error label.
    #[inline]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    #[inline]
    pub(crate) fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn from_error_uses_root_label() {
        let err = CallError::RetryExhausted {
            attempts: 2,
            last: Box::new(CallError::Timeout {
                timeout: Duration::from_secs(10),
            }),
        };
        let ev = DegradationEvent::from_error(&err);
        assert_eq!(ev.label, Some("call_timeout"));
        assert!(ev.reason.contains("retries exhausted"));
        assert_eq!(ev.seq, 0);
    }
}
