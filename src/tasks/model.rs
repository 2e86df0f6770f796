//! # Task data model.
//!
//! - [`TaskStatus`]: `queued → running → {done | failed}`, forward only.
//! - [`TaskSnapshot`]: the JSON body of a `status` stream event.
//! - [`TaskRecord`]: what the registry stores and hands out.
//!
//! ## Wire format
//! ```json
//! { "id": "t1", "status": "running", "progress": 40, "label": "Import contacts",
//!   "tenant": "acme", "type": "import", "result": null, "error": null }
//! ```
//! `progress` is clamped to `0..=100` and rounded; missing or `null` means 0.

use std::time::SystemTime;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Lifecycle state of a backend task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl TaskStatus {
    /// Position in the forward-only order; `Done` and `Failed` share the last rank.
    #[inline]
    pub fn rank(self) -> u8 {
        match self {
            TaskStatus::Queued => 0,
            TaskStatus::Running => 1,
            TaskStatus::Done | TaskStatus::Failed => 2,
        }
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    /// `queued` or `running`.
    #[inline]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }
}

/// Full task state as reported by one `status` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "de_progress")]
    pub progress: u8,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub tenant: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl TaskSnapshot {
    /// Minimal snapshot, mostly for tests and mock backends.
    pub fn new(id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            status,
            progress: 0,
            label: String::new(),
            tenant: String::new(),
            kind: None,
            result: None,
            error: None,
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_error(mut self, error: Value) -> Self {
        self.error = Some(error);
        self
    }
}

fn de_progress<'de, D>(de: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(de)?;
    Ok(match raw {
        Some(v) if v.is_finite() => v.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    })
}

/// A task as held by the registry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskRecord {
    pub id: String,
    pub status: TaskStatus,
    /// Only meaningful while `status == Running`.
    pub progress: u8,
    pub label: String,
    pub tenant: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Present only when `status == Done`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present only when `status == Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// When the last event for this task was applied.
    pub updated_at: SystemTime,
}

impl TaskRecord {
    pub(crate) fn from_snapshot(snap: TaskSnapshot, at: SystemTime) -> Self {
        let mut rec = Self {
            id: snap.id,
            status: snap.status,
            progress: snap.progress,
            label: snap.label,
            tenant: snap.tenant,
            kind: snap.kind,
            result: None,
            error: None,
            updated_at: at,
        };
        rec.set_outcome(snap.result, snap.error);
        rec
    }

    /// Keeps `result` only for `done` and `error` only for `failed`.
    pub(crate) fn set_outcome(&mut self, result: Option<Value>, error: Option<Value>) {
        match self.status {
            TaskStatus::Done => self.result = result,
            TaskStatus::Failed => self.error = error,
            TaskStatus::Queued | TaskStatus::Running => {}
        }
    }

    /// Lookup key for the audit/detail read, available once the task is terminal.
    pub fn audit_key(&self) -> Option<&str> {
        self.status.is_terminal().then_some(self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_full_status_body() {
        let snap: TaskSnapshot = serde_json::from_value(json!({
            "id": "t1", "status": "done", "progress": 100, "label": "Sync",
            "tenant": "acme", "type": "sync", "result": { "ok": true }
        }))
        .unwrap();
        assert_eq!(snap.status, TaskStatus::Done);
        assert_eq!(snap.kind.as_deref(), Some("sync"));
        assert_eq!(snap.result, Some(json!({ "ok": true })));
    }

    #[test]
    fn progress_is_clamped_and_defaulted() {
        let over: TaskSnapshot =
            serde_json::from_value(json!({ "id": "a", "status": "running", "progress": 140.2 })).unwrap();
        let null: TaskSnapshot =
            serde_json::from_value(json!({ "id": "b", "status": "running", "progress": null })).unwrap();
        let missing: TaskSnapshot = serde_json::from_value(json!({ "id": "c", "status": "queued" })).unwrap();
        assert_eq!(over.progress, 100);
        assert_eq!(null.progress, 0);
        assert_eq!(missing.progress, 0);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let res = serde_json::from_value::<TaskSnapshot>(json!({ "id": "x", "status": "paused" }));
        assert!(res.is_err());
    }

    #[test]
    fn result_dropped_unless_done() {
        let snap = TaskSnapshot::new("t", TaskStatus::Running).with_result(json!(1));
        let rec = TaskRecord::from_snapshot(snap, SystemTime::now());
        assert_eq!(rec.result, None);
        assert_eq!(rec.audit_key(), None);

        let failed = TaskSnapshot::new("t", TaskStatus::Failed).with_error(json!("quota"));
        let rec = TaskRecord::from_snapshot(failed, SystemTime::now());
        assert_eq!(rec.error, Some(json!("quota")));
        assert_eq!(rec.audit_key(), Some("t"));
    }
}
