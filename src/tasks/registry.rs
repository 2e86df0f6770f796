//! # Task registry: stream-fed task lifecycle store.
//!
//! The registry holds at most one [`TaskRecord`] per id, fed exclusively by the
//! task stream. Delivery is neither exactly-once nor ordered, so every update is
//! checked against the stored record before it is applied.
//!
//! ## Architecture
//! ```text
//! TaskStream ──► apply(TaskSnapshot)
//!                  ├─► tombstoned id          → Ignored(Evicted)
//!                  ├─► unknown id             → insert in reported status (Created)
//!                  ├─► stored is terminal     → Ignored(Terminal)
//!                  ├─► status moves backwards → Ignored(Regression)
//!                  ├─► running, lower progress→ Ignored(StaleProgress)
//!                  └─► otherwise              → Updated
//!                        └─ terminal transition → schedule eviction(grace) once
//!
//! eviction timer ──► sleep(grace) ──► same generation? ──► evict(id) ──► tombstone(id) ──► Evicted change
//!                                        └─ no (id evicted and re-created) → skip
//! ```
//!
//! ## Rules
//! - Status only moves forward: `queued → running → {done | failed}`.
//! - While running, progress never decreases; a lower value is dropped, a forward
//!   status change carried by the same event is still applied.
//! - Terminal records absorb every later event; their eviction is scheduled exactly once.
//! - Evicted terminal ids are tombstoned (bounded) so late duplicates cannot resurrect them.
//! - An eviction timer only removes the record it was scheduled for, never a later
//!   record created under the same id.
//! - An empty label, kind or tenant in an update keeps the stored value.
//! - `list` returns records in insertion order.
//! - Nothing here returns an error; rejected updates are logged at debug level.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use indexmap::{IndexMap, IndexSet};
use tokio::sync::{RwLock, broadcast};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::tasks::model::{TaskRecord, TaskSnapshot, TaskStatus};

/// Why an event was not applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The stored task already reached `done` or `failed`.
    Terminal,
    /// The event reports an earlier status than the stored one.
    Regression,
    /// Same `running` status with a lower progress value.
    StaleProgress,
    /// The id was evicted after its grace window.
    Evicted,
    /// The registry was closed.
    Closed,
}

/// What [`TaskRegistry::apply`] did with an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    Created,
    Updated,
    Ignored(IgnoreReason),
}

/// Kind of registry mutation broadcast to watchers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// A record was created or updated and is still active.
    Upserted,
    /// A record reached `done` or `failed`; its audit detail can be fetched now.
    Terminal(TaskStatus),
    /// A record was removed.
    Evicted,
}

/// Registry mutation notice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryChange {
    pub id: Arc<str>,
    pub kind: ChangeKind,
}

#[derive(Default)]
struct State {
    tasks: IndexMap<String, TaskRecord>,
    /// Generation of each stored record; re-creating an id gives it a new one.
    generations: HashMap<String, u64>,
    next_generation: u64,
    tombstones: IndexSet<String>,
}

impl State {
    fn insert(&mut self, rec: TaskRecord) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.generations.insert(rec.id.clone(), generation);
        self.tasks.insert(rec.id.clone(), rec);
        generation
    }

    /// Removes `id`, tombstoning it if it was terminal. Returns `true` if a record was removed.
    fn remove(&mut self, id: &str, tombstone_cap: usize) -> bool {
        self.generations.remove(id);
        let Some(rec) = self.tasks.shift_remove(id) else {
            return false;
        };
        if rec.status.is_terminal() && tombstone_cap > 0 {
            self.tombstones.insert(rec.id);
            while self.tombstones.len() > tombstone_cap {
                self.tombstones.shift_remove_index(0);
            }
        }
        true
    }
}

/// Keyed store of task records with scheduled eviction of terminal tasks.
///
/// Scoped to one stream connection: construct it when the stream opens and
/// [`close`](Self::close) (or drop) it when the stream ends.
pub struct TaskRegistry {
    state: RwLock<State>,
    grace: Duration,
    tombstone_cap: usize,
    changes: broadcast::Sender<RegistryChange>,
    token: CancellationToken,
    me: Weak<TaskRegistry>,
}

impl TaskRegistry {
    /// Creates a registry using `grace` and `tombstones` from `cfg`.
    pub fn new(cfg: &Config) -> Arc<Self> {
        Self::with_grace(cfg.grace, cfg.tombstones)
    }

    /// Creates a registry with an explicit grace window and tombstone capacity.
    pub fn with_grace(grace: Duration, tombstones: usize) -> Arc<Self> {
        let (changes, _rx) = broadcast::channel(256);
        Arc::new_cyclic(|me| Self {
            state: RwLock::new(State::default()),
            grace,
            tombstone_cap: tombstones,
            changes,
            token: CancellationToken::new(),
            me: me.clone(),
        })
    }

    /// Applies one status snapshot. Idempotent for duplicate events.
    ///
    /// Must be called from within a tokio runtime (terminal transitions spawn
    /// the eviction timer).
    pub async fn apply(&self, snap: TaskSnapshot) -> Applied {
        if self.token.is_cancelled() {
            return Applied::Ignored(IgnoreReason::Closed);
        }
        let now = SystemTime::now();
        let mut state = self.state.write().await;

        if state.tombstones.contains(&snap.id) {
            tracing::debug!(id = %snap.id, status = snap.status.as_str(), "event for evicted task ignored");
            return Applied::Ignored(IgnoreReason::Evicted);
        }

        let generation = state.generations.get(&snap.id).copied().unwrap_or_default();
        let Some(rec) = state.tasks.get_mut(&snap.id) else {
            let rec = TaskRecord::from_snapshot(snap, now);
            let id: Arc<str> = Arc::from(rec.id.as_str());
            let status = rec.status;
            let generation = state.insert(rec);
            drop(state);
            self.after_write(id, status, generation);
            return Applied::Created;
        };

        if rec.status.is_terminal() {
            tracing::debug!(id = %snap.id, "event for terminal task ignored");
            return Applied::Ignored(IgnoreReason::Terminal);
        }
        if snap.status.rank() < rec.status.rank() {
            tracing::debug!(
                id = %snap.id,
                stored = rec.status.as_str(),
                incoming = snap.status.as_str(),
                "status regression ignored"
            );
            return Applied::Ignored(IgnoreReason::Regression);
        }

        let advances = snap.status.rank() > rec.status.rank();
        let regressive = rec.status == TaskStatus::Running && snap.progress < rec.progress;
        if !advances && regressive {
            tracing::debug!(
                id = %snap.id,
                stored = rec.progress,
                incoming = snap.progress,
                "progress regression ignored"
            );
            return Applied::Ignored(IgnoreReason::StaleProgress);
        }

        rec.progress = if advances {
            rec.progress.max(snap.progress)
        } else {
            snap.progress
        };
        rec.status = snap.status;
        if !snap.label.is_empty() {
            rec.label = snap.label;
        }
        if snap.kind.is_some() {
            rec.kind = snap.kind;
        }
        if !snap.tenant.is_empty() {
            rec.tenant = snap.tenant;
        }
        rec.set_outcome(snap.result, snap.error);
        rec.updated_at = now;

        let id: Arc<str> = Arc::from(rec.id.as_str());
        let status = rec.status;
        drop(state);
        self.after_write(id, status, generation);
        Applied::Updated
    }

    /// Broadcasts the change and, for terminal records, schedules eviction.
    fn after_write(&self, id: Arc<str>, status: TaskStatus, generation: u64) {
        if status.is_terminal() {
            self.schedule_eviction(id.clone(), generation);
            self.publish(id, ChangeKind::Terminal(status));
        } else {
            self.publish(id, ChangeKind::Upserted);
        }
    }

    fn schedule_eviction(&self, id: Arc<str>, generation: u64) {
        let me = self.me.clone();
        let token = self.token.clone();
        let grace = self.grace;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep(grace) => {
                    if let Some(reg) = me.upgrade() {
                        reg.evict_expired(&id, generation).await;
                    }
                }
            }
        });
    }

    /// Removes `id` unconditionally. Redundant calls are no-ops.
    ///
    /// Returns `true` if a record was removed.
    pub async fn evict(&self, id: &str) -> bool {
        let mut state = self.state.write().await;
        let removed = state.remove(id, self.tombstone_cap);
        drop(state);

        if removed {
            tracing::debug!(id, "task evicted");
            self.publish(Arc::from(id), ChangeKind::Evicted);
        }
        removed
    }

    /// Grace-window eviction: removes `id` only if it is still the record of `generation`.
    async fn evict_expired(&self, id: &str, generation: u64) {
        let mut state = self.state.write().await;
        if state.generations.get(id) != Some(&generation) {
            tracing::debug!(id, generation, "eviction skipped, task was replaced");
            return;
        }
        let removed = state.remove(id, self.tombstone_cap);
        drop(state);

        if removed {
            tracing::debug!(id, "task evicted after grace window");
            self.publish(Arc::from(id), ChangeKind::Evicted);
        }
    }

    /// Snapshot of records matching `predicate`, in insertion order.
    pub async fn list<P>(&self, predicate: P) -> Vec<TaskRecord>
    where
        P: Fn(&TaskRecord) -> bool,
    {
        let state = self.state.read().await;
        state
            .tasks
            .values()
            .filter(|rec| predicate(rec))
            .cloned()
            .collect()
    }

    /// Records still `queued` or `running`.
    pub async fn active(&self) -> Vec<TaskRecord> {
        self.list(|rec| rec.status.is_active()).await
    }

    pub async fn get(&self, id: &str) -> Option<TaskRecord> {
        self.state.read().await.tasks.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.tasks.is_empty()
    }

    /// Receiver of registry mutations made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryChange> {
        self.changes.subscribe()
    }

    /// Cancels pending evictions and drops every record. Later events are ignored.
    pub async fn close(&self) {
        self.token.cancel();
        let mut state = self.state.write().await;
        state.tasks.clear();
        state.generations.clear();
        state.tombstones.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    fn publish(&self, id: Arc<str>, kind: ChangeKind) {
        let _ = self.changes.send(RegistryChange { id, kind });
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
