//! # StreamHub: one task stream per (base address, tenant).
//!
//! A [`StreamSession`] owns everything scoped to one connection: the
//! [`TaskRegistry`] it feeds, the cancellation token and the pump task.
//! Sessions are handed out as `Arc`; the hub only keeps a `Weak`, so the last
//! owner dropping its handle tears the connection down.
//!
//! Each key has its own slot. The hub-wide map is locked only to find or create
//! a slot; connecting happens under the slot's lock, so concurrent opens of one
//! key share a connection while other keys never wait on it.
//!
//! ```text
//! open(backend)
//!   ├─► slot for key (map lock, short)
//!   └─► slot lock
//!         ├─► live session         ─► same Arc<StreamSession>
//!         └─► none / finished      ─► connect() ─► new registry ─► spawn pump
//!                                       └─ Err(StreamError) surfaced to the caller
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio_util::sync::CancellationToken;

use crate::backend::BackendClient;
use crate::config::Config;
use crate::error::StreamError;
use crate::stream::client::{StreamEnd, TaskStream, TaskStreamClient};
use crate::tasks::TaskRegistry;

type Key = (String, String);
type Slot = Arc<AsyncMutex<Weak<StreamSession>>>;

/// Deduplicates stream connections.
pub struct StreamHub {
    cfg: Config,
    slots: Mutex<HashMap<Key, Slot>>,
}

impl StreamHub {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the live session for `backend`'s (base, tenant), opening one if needed.
    ///
    /// Opening is bounded by [`Config::connect_timeout`].
    pub async fn open(&self, backend: &BackendClient) -> Result<Arc<StreamSession>, StreamError> {
        let key = (
            backend.base().to_string(),
            backend.context().tenant().to_string(),
        );
        let slot = self.slot(key.clone());
        let mut current = slot.lock().await;

        if let Some(existing) = current.upgrade() {
            if !existing.is_finished() {
                return Ok(existing);
            }
        }

        let stream = TaskStreamClient::new(backend.clone())
            .with_max_frame(self.cfg.max_frame_bytes)
            .connect()
            .await?;
        let session = Arc::new(StreamSession::spawn(
            key.0,
            stream,
            TaskRegistry::new(&self.cfg),
        ));
        *current = Arc::downgrade(&session);
        Ok(session)
    }

    /// Number of sessions still referenced by an owner. Keys being opened are not counted.
    pub fn live_sessions(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .values()
            .filter(|slot| slot.try_lock().is_ok_and(|s| s.strong_count() > 0))
            .count()
    }

    /// Finds or creates the slot for `key`, pruning slots nobody uses.
    fn slot(&self, key: Key) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        // a slot held only by the map has no opener and, if its session is gone, no use
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1 || slot.try_lock().is_ok_and(|s| s.strong_count() > 0)
        });
        slots.entry(key).or_default().clone()
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// One running stream connection and the registry it feeds.
pub struct StreamSession {
    base: String,
    tenant: String,
    registry: Arc<TaskRegistry>,
    token: CancellationToken,
    /// `Some` once the pump returned.
    ended: watch::Receiver<Option<StreamEnd>>,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("base", &self.base)
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}

impl StreamSession {
    /// Spawns the pump for an already-open stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(base: String, mut stream: TaskStream, registry: Arc<TaskRegistry>) -> Self {
        let token = CancellationToken::new();
        let tenant = stream.tenant().to_string();
        let (ended_tx, ended) = watch::channel(None);

        let pump_registry = registry.clone();
        let pump_token = token.clone();
        tokio::spawn(async move {
            let end = stream.run(&pump_registry, &pump_token).await;
            if end == StreamEnd::Cancelled {
                pump_registry.close().await;
            }
            ended_tx.send_replace(Some(end));
        });

        Self {
            base,
            tenant,
            registry,
            token,
            ended,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// The registry fed by this connection. Read-only for everyone but the pump.
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// True once the session was closed or its stream ended.
    ///
    /// Independent of any pending [`wait`](Self::wait).
    pub fn is_finished(&self) -> bool {
        self.token.is_cancelled()
            || self.ended.borrow().is_some()
            // pump gone without reporting: it panicked
            || self.ended.has_changed().is_err()
    }

    /// Waits for the stream to end.
    ///
    /// Any number of callers may wait, before or after the end.
    pub async fn wait(&self) -> StreamEnd {
        let mut ended = self.ended.clone();
        let end = ended.wait_for(Option::is_some).await.map(|e| (*e).clone());
        match end {
            Ok(Some(end)) => end,
            _ => {
                tracing::error!(base = %self.base, tenant = %self.tenant, "stream pump aborted");
                StreamEnd::Failed("stream pump aborted".into())
            }
        }
    }

    /// Cancels the stream and drops every tracked task.
    pub async fn close(&self) {
        self.token.cancel();
        self.registry.close().await;
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskStatus;
    use futures::{StreamExt, stream};
    use std::convert::Infallible;
    use std::time::Duration;

    fn session(parts: Vec<&'static str>, pending: bool) -> StreamSession {
        let items: Vec<Result<&'static [u8], Infallible>> =
            parts.into_iter().map(|p| Ok(p.as_bytes())).collect();
        let body = stream::iter(items);
        let stream = if pending {
            TaskStream::from_stream("acme", body.chain(stream::pending()))
        } else {
            TaskStream::from_stream("acme", body)
        };
        StreamSession::spawn(
            "http://backend".into(),
            stream,
            TaskRegistry::with_grace(Duration::from_secs(5), 8),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn closed_stream_keeps_last_state_readable() {
        let s = session(
            vec!["event: status\ndata: {\"id\":\"t1\",\"status\":\"running\",\"progress\":10}\n\n"],
            false,
        );
        assert_eq!(s.wait().await, StreamEnd::Closed);
        assert!(s.is_finished());
        assert_eq!(
            s.registry().get("t1").await.unwrap().status,
            TaskStatus::Running
        );
        assert_eq!(s.wait().await, StreamEnd::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pump_and_clears_registry() {
        let s = session(
            vec!["event: status\ndata: {\"id\":\"t1\",\"status\":\"queued\"}\n\n"],
            true,
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(s.registry().len().await, 1);
        assert!(!s.is_finished());

        s.close().await;
        assert_eq!(s.wait().await, StreamEnd::Cancelled);
        assert!(s.registry().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_wait_does_not_mark_a_live_session_finished() {
        let s = Arc::new(session(vec![], true));
        let waiter = {
            let s = s.clone();
            tokio::spawn(async move { s.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!waiter.is_finished());
        assert!(!s.is_finished());

        s.close().await;
        assert_eq!(waiter.await.unwrap(), StreamEnd::Cancelled);
        assert!(s.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn many_waiters_see_the_same_end() {
        let s = Arc::new(session(vec![], true));
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let s = s.clone();
                tokio::spawn(async move { s.wait().await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(10)).await;
        s.close().await;

        for w in waiters {
            assert_eq!(w.await.unwrap(), StreamEnd::Cancelled);
        }
    }

    #[tokio::test]
    async fn invalid_backend_never_registers_a_session() {
        let hub = StreamHub::default();
        let ctx = crate::context::CallContext::new("acme", crate::context::ActorRole::Admin, false).unwrap();
        let backend = BackendClient::new("http://127.0.0.1:9", ctx, &Config::default()).unwrap();

        assert!(hub.open(&backend).await.is_err());
        assert_eq!(hub.live_sessions(), 0);
    }
}
