//! Error types used by the call layer and the task stream.
//!
//! This module defines three error enums:
//!
//! - [`CallError`]: failures of a single live call (timeout, transport, decode, exhausted retries).
//! - [`StreamError`]: failures to open the task stream connection.
//! - [`ContextError`]: invalid [`CallContext`](crate::CallContext) input.
//!
//! `CallError` never crosses the boundary of [`ResilientExecutor`](crate::ResilientExecutor);
//! it is converted into a degradation notification plus a fallback value there.
//! All types provide `as_label` / `as_message` helpers for logging.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by a live call attempt.
///
/// `Timeout` and `Transport` are retryable; `Decode` is not (the same body will
/// fail to decode again). `RetryExhausted` wraps the last failure once the retry
/// budget is spent.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum CallError {
    /// The call did not settle within its deadline.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// Network or HTTP-level failure.
    #[error("transport failure: {error}")]
    Transport {
        /// The underlying error message.
        error: String,
    },

    /// The response body could not be decoded.
    #[error("decode failure: {error}")]
    Decode {
        /// The underlying error message.
        error: String,
    },

    /// Every attempt failed; carries the last failure.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Number of attempts made (retries + 1).
        attempts: u32,
        /// The failure of the final attempt.
        last: Box<CallError>,
    },
}

impl CallError {
    /// Shorthand for [`CallError::Transport`].
    pub fn transport(error: impl ToString) -> Self {
        CallError::Transport {
            error: error.to_string(),
        }
    }

    /// Shorthand for [`CallError::Decode`].
    pub fn decode(error: impl ToString) -> Self {
        CallError::Decode {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use copilot_core::CallError;
    /// use std::time::Duration;
    ///
    /// let err = CallError::Timeout { timeout: Duration::from_secs(10) };
    /// assert_eq!(err.as_label(), "call_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CallError::Timeout { .. } => "call_timeout",
            CallError::Transport { .. } => "call_transport",
            CallError::Decode { .. } => "call_decode",
            CallError::RetryExhausted { .. } => "call_retry_exhausted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CallError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            CallError::Transport { error } => format!("transport: {error}"),
            CallError::Decode { error } => format!("decode: {error}"),
            CallError::RetryExhausted { attempts, last } => {
                format!("exhausted after {attempts} attempts; last {}", last.as_message())
            }
        }
    }

    /// Indicates whether another attempt may succeed.
    ///
    /// # Example
    /// ```
    /// use copilot_core::CallError;
    ///
    /// assert!(CallError::transport("connection reset").is_retryable());
    /// assert!(!CallError::decode("expected value at line 1").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, CallError::Timeout { .. } | CallError::Transport { .. })
    }

    /// Returns the innermost failure, unwrapping `RetryExhausted`.
    pub fn root(&self) -> &CallError {
        match self {
            CallError::RetryExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured deadline
            CallError::Timeout {
                timeout: Duration::ZERO,
            }
        } else if err.is_decode() {
            CallError::decode(err)
        } else {
            CallError::transport(err)
        }
    }
}

impl From<serde_json::Error> for CallError {
    fn from(err: serde_json::Error) -> Self {
        CallError::decode(err)
    }
}

/// # Errors produced while opening the task stream.
///
/// This is the only failure surfaced to the stream's owner; decoding problems
/// inside an open stream are logged and dropped.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StreamError {
    /// The connection could not be established.
    #[error("stream connect failed: {error}")]
    Connect {
        /// The underlying error message.
        error: String,
    },

    /// The backend accepted the connection but sent no response headers in time.
    #[error("stream open timed out after {timeout:?}")]
    Timeout {
        /// The exceeded bound.
        timeout: Duration,
    },

    /// The backend answered with a non-success status.
    #[error("stream rejected with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The backend base address is not a valid URL.
    #[error("invalid backend url {url:?}: {error}")]
    InvalidUrl {
        /// Offending input.
        url: String,
        /// Parser message.
        error: String,
    },
}

impl StreamError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamError::Connect { .. } => "stream_connect",
            StreamError::Timeout { .. } => "stream_timeout",
            StreamError::Status { .. } => "stream_status",
            StreamError::InvalidUrl { .. } => "stream_invalid_url",
        }
    }
}

/// # Invalid call context input.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// Tenant identifier was empty or whitespace.
    #[error("tenant identifier must not be empty")]
    EmptyTenant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_reports_root_cause() {
        let err = CallError::RetryExhausted {
            attempts: 2,
            last: Box::new(CallError::Timeout {
                timeout: Duration::from_secs(10),
            }),
        };
        assert_eq!(err.as_label(), "call_retry_exhausted");
        assert_eq!(err.root().as_label(), "call_timeout");
        assert!(err.as_message().contains("2 attempts"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn stream_error_labels() {
        assert_eq!(StreamError::Status { status: 503 }.as_label(), "stream_status");
        assert_eq!(
            StreamError::Status { status: 503 }.to_string(),
            "stream rejected with status 503"
        );
    }
}
