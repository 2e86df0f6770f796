//! # TaskStreamClient: SSE consumer feeding a [`TaskRegistry`].
//!
//! ```text
//! connect() ──► GET {base}/tasks/stream ──► TaskStream
//!                  └─ non-2xx / network / no headers in time ──► Err(StreamError)   (only surfaced failure)
//!
//! TaskStream::run(registry, token)
//! loop {
//!   ├─► token cancelled           ─► StreamEnd::Cancelled
//!   ├─► body ended                ─► StreamEnd::Closed
//!   ├─► body error                ─► StreamEnd::Failed(reason)   (logged at error)
//!   └─► chunk ─► SseDecoder ─► frames
//!          ├─ decode error        ─► warn, drop
//!          ├─ heartbeat           ─► trace
//!          ├─ foreign tenant      ─► warn, drop
//!          └─ status              ─► registry.apply(snapshot)
//! }
//! ```
//!
//! The client never reconnects; the owner of the stream decides what to do with
//! the returned [`StreamEnd`].

use std::fmt;
use std::sync::Arc;

use futures::stream::{BoxStream, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::backend::BackendClient;
use crate::error::StreamError;
use crate::stream::event::StreamEvent;
use crate::stream::sse::{DEFAULT_MAX_FRAME, SseDecoder, SseFrame};
use crate::tasks::{Applied, TaskRegistry};

/// Why [`TaskStream::run`] returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// The backend closed the connection.
    Closed,
    /// The owner cancelled the stream.
    Cancelled,
    /// The connection broke mid-stream.
    Failed(String),
}

/// Counters reported when a stream ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub applied: u64,
    pub ignored: u64,
    pub dropped: u64,
    pub heartbeats: u64,
}

/// Opens task streams for one backend and tenant.
#[derive(Clone, Debug)]
pub struct TaskStreamClient {
    backend: BackendClient,
    max_frame: usize,
}

impl TaskStreamClient {
    pub fn new(backend: BackendClient) -> Self {
        Self {
            backend,
            max_frame: DEFAULT_MAX_FRAME,
        }
    }

    /// Drops stream frames larger than `max_frame` bytes.
    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Opens the stream connection.
    ///
    /// Failing to open is the only error surfaced by the stream layer.
    pub async fn connect(&self) -> Result<TaskStream, StreamError> {
        let resp = self.backend.open_task_stream().await.inspect_err(|e| {
            tracing::error!(
                base = self.backend.base(),
                label = e.as_label(),
                error = %e,
                "task stream could not be opened"
            );
        })?;
        tracing::debug!(base = self.backend.base(), "task stream opened");

        Ok(
            TaskStream::from_stream(self.backend.context().tenant(), resp.bytes_stream())
                .with_max_frame(self.max_frame),
        )
    }
}

/// An open task stream, consumed by [`TaskStream::run`].
pub struct TaskStream {
    tenant: Arc<str>,
    body: BoxStream<'static, Result<Vec<u8>, String>>,
    decoder: SseDecoder,
    stats: StreamStats,
}

impl fmt::Debug for TaskStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStream")
            .field("tenant", &self.tenant)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl TaskStream {
    /// Wraps any byte-chunk stream, e.g. a recorded response body.
    pub fn from_stream<S, B, E>(tenant: &str, body: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        let body = body
            .map(|chunk| chunk.map(|b| b.as_ref().to_vec()).map_err(|e| e.to_string()))
            .boxed();
        Self {
            tenant: Arc::from(tenant),
            body,
            decoder: SseDecoder::new(),
            stats: StreamStats::default(),
        }
    }

    /// Replaces the frame size bound (default 1 MiB).
    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.decoder = SseDecoder::with_max_frame(max_frame);
        self
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Pumps events into `registry` until the stream ends or `token` is cancelled.
    pub async fn run(&mut self, registry: &TaskRegistry, token: &CancellationToken) -> StreamEnd {
        let end = loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => break StreamEnd::Cancelled,
                next = self.body.next() => next,
            };
            match next {
                None => break StreamEnd::Closed,
                Some(Err(reason)) => {
                    tracing::error!(tenant = %self.tenant, error = %reason, "task stream broke");
                    break StreamEnd::Failed(reason);
                }
                Some(Ok(chunk)) => {
                    self.decoder.push(&chunk);
                    while let Some(frame) = self.decoder.next_frame() {
                        self.handle(frame, registry).await;
                    }
                }
            }
        };

        if self.decoder.pending() > 0 {
            tracing::debug!(bytes = self.decoder.pending(), "discarding incomplete stream frame");
        }
        tracing::info!(
            tenant = %self.tenant,
            end = ?end,
            applied = self.stats.applied,
            ignored = self.stats.ignored,
            dropped = self.stats.dropped,
            oversized = self.decoder.oversized(),
            heartbeats = self.stats.heartbeats,
            "task stream ended"
        );
        end
    }

    async fn handle(&mut self, frame: SseFrame, registry: &TaskRegistry) {
        let event = match StreamEvent::decode(&frame) {
            Ok(ev) => ev,
            Err(e) => {
                self.stats.dropped += 1;
                tracing::warn!(
                    event = frame.event.as_deref().unwrap_or(""),
                    error = %e,
                    "dropping malformed stream event"
                );
                return;
            }
        };

        let mut snap = match event {
            StreamEvent::Heartbeat => {
                self.stats.heartbeats += 1;
                tracing::trace!("task stream heartbeat");
                return;
            }
            StreamEvent::Status(snap) => snap,
        };

        if snap.tenant.is_empty() {
            snap.tenant = self.tenant.to_string();
        } else if snap.tenant != *self.tenant {
            self.stats.dropped += 1;
            tracing::warn!(
                id = %snap.id,
                expected = %self.tenant,
                got = %snap.tenant,
                "dropping status event for foreign tenant"
            );
            return;
        }

        match registry.apply(snap).await {
            Applied::Created | Applied::Updated => self.stats.applied += 1,
            Applied::Ignored(_) => self.stats.ignored += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskStatus;
    use futures::stream;
    use std::convert::Infallible;
    use std::time::Duration;

    fn chunks(parts: &[&'static str]) -> Vec<Result<&'static [u8], Infallible>> {
        parts.iter().map(|p| Ok(p.as_bytes())).collect()
    }

    fn registry() -> Arc<TaskRegistry> {
        TaskRegistry::with_grace(Duration::from_secs(5), 8)
    }

    #[tokio::test(start_paused = true)]
    async fn applies_status_events_and_skips_noise() {
        let reg = registry();
        let body = stream::iter(chunks(&[
            "event: heartbeat\ndata: {}\n\n",
            "event: status\ndata: {\"id\":\"t1\",\"status\":\"queued\",\"tenant\":\"acme\"}\n\n",
            "event: status\ndata: {broken\n\n",
            "event: status\ndata: {\"id\":\"t1\",\"status\":\"running\",\"progress\":40,",
            "\"tenant\":\"acme\"}\n\n",
            "event: mystery\ndata: {}\n\n",
        ]));
        let mut ts = TaskStream::from_stream("acme", body);

        let end = ts.run(&reg, &CancellationToken::new()).await;

        assert_eq!(end, StreamEnd::Closed);
        let rec = reg.get("t1").await.unwrap();
        assert_eq!(rec.status, TaskStatus::Running);
        assert_eq!(rec.progress, 40);
        assert_eq!(
            ts.stats(),
            StreamStats {
                applied: 2,
                ignored: 0,
                dropped: 2,
                heartbeats: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_tenant_is_dropped_and_missing_tenant_is_scoped() {
        let reg = registry();
        let body = stream::iter(chunks(&[
            "event: status\ndata: {\"id\":\"x\",\"status\":\"running\",\"tenant\":\"globex\"}\n\n",
            "event: status\ndata: {\"id\":\"y\",\"status\":\"running\"}\n\n",
        ]));
        let mut ts = TaskStream::from_stream("acme", body);
        ts.run(&reg, &CancellationToken::new()).await;

        assert!(reg.get("x").await.is_none());
        assert_eq!(reg.get("y").await.unwrap().tenant, "acme");
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_ends_with_failed() {
        let reg = registry();
        let body = stream::iter(vec![
            Ok(b"event: status\ndata: {\"id\":\"t\",\"status\":\"queued\"}\n\n".to_vec()),
            Err("connection reset"),
        ]);
        let mut ts = TaskStream::from_stream("acme", body);

        let end = ts.run(&reg, &CancellationToken::new()).await;
        assert_eq!(end, StreamEnd::Failed("connection reset".into()));
        assert!(reg.get("t").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_frame_does_not_stop_the_stream() {
        let reg = registry();
        let huge = format!("event: status\ndata: {}\n\n", "z".repeat(4096));
        let body = stream::iter(vec![
            Ok::<_, Infallible>(huge.into_bytes()),
            Ok(b"event: status\ndata: {\"id\":\"t9\",\"status\":\"queued\"}\n\n".to_vec()),
        ]);
        let mut ts = TaskStream::from_stream("acme", body).with_max_frame(1024);

        assert_eq!(ts.run(&reg, &CancellationToken::new()).await, StreamEnd::Closed);
        assert!(reg.get("t9").await.is_some());
        assert_eq!(reg.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_a_silent_stream() {
        let reg = registry();
        let mut ts = TaskStream::from_stream("acme", stream::pending::<Result<Vec<u8>, Infallible>>());
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });
        assert_eq!(ts.run(&reg, &token).await, StreamEnd::Cancelled);
    }
}
