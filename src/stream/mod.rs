//! Task stream: SSE parsing, event decoding and the connection that feeds a
//! [`TaskRegistry`](crate::TaskRegistry).
//!
//! ## Contents
//! - [`SseDecoder`] / [`SseFrame`]: incremental `text/event-stream` framing
//! - [`StreamEvent`]: `status` and `heartbeat` events
//! - [`TaskStreamClient`] / [`TaskStream`]: connect once, pump until the stream ends
//! - [`StreamHub`] / [`StreamSession`]: one connection per (base address, tenant)
//!
//! Malformed events are logged and dropped; only failing to open the connection
//! is returned as an error ([`StreamError`](crate::StreamError)).

mod client;
mod event;
mod hub;
mod sse;

pub use client::{StreamEnd, StreamStats, TaskStream, TaskStreamClient};
pub use event::{HEARTBEAT_EVENT, STATUS_EVENT, StreamEvent};
pub use hub::{StreamHub, StreamSession};
pub use sse::{SseDecoder, SseFrame};
