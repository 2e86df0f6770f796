//! # Tagged result of a resilient call.
//!
//! Callers that only want data use [`CallOutcome::into_inner`]; callers that need to
//! tell live data from fallback data match on the variant or check
//! [`CallOutcome::is_degraded`].

use std::sync::Arc;

/// Result of [`ResilientExecutor`](crate::ResilientExecutor); always carries a value.
#[derive(Clone, Debug, PartialEq)]
pub enum CallOutcome<T> {
    /// Live operation succeeded.
    Fresh(T),
    /// Live operation failed; the mock operation produced `value`.
    Degraded { value: T, reason: Arc<str> },
    /// Live and mock both failed; `value` is the configured sentinel.
    Sentinel { value: T, reason: Arc<str> },
}

impl<T> CallOutcome<T> {
    /// Consumes the outcome, returning the carried value regardless of origin.
    pub fn into_inner(self) -> T {
        match self {
            CallOutcome::Fresh(value)
            | CallOutcome::Degraded { value, .. }
            | CallOutcome::Sentinel { value, .. } => value,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            CallOutcome::Fresh(value)
            | CallOutcome::Degraded { value, .. }
            | CallOutcome::Sentinel { value, .. } => value,
        }
    }

    /// True unless the value came from the live operation.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, CallOutcome::Fresh(_))
    }

    /// Why the live path was abandoned, if it was.
    pub fn reason(&self) -> Option<&str> {
        match self {
            CallOutcome::Fresh(_) => None,
            CallOutcome::Degraded { reason, .. } | CallOutcome::Sentinel { reason, .. } => {
                Some(reason)
            }
        }
    }

    /// Maps the carried value, keeping the variant.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> CallOutcome<U> {
        match self {
            CallOutcome::Fresh(v) => CallOutcome::Fresh(f(v)),
            CallOutcome::Degraded { value, reason } => CallOutcome::Degraded {
                value: f(value),
                reason,
            },
            CallOutcome::Sentinel { value, reason } => CallOutcome::Sentinel {
                value: f(value),
                reason,
            },
        }
    }
}
