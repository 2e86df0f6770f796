//! Typed task stream events.

use crate::error::CallError;
use crate::stream::sse::SseFrame;
use crate::tasks::TaskSnapshot;

/// Event name carrying a full task snapshot.
pub const STATUS_EVENT: &str = "status";
/// Event name of the liveness ping.
pub const HEARTBEAT_EVENT: &str = "heartbeat";

/// A decoded task stream event.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Full task state; applied to the registry.
    Status(TaskSnapshot),
    /// Liveness ping; no state change.
    Heartbeat,
}

impl StreamEvent {
    /// Decodes a frame into an event.
    ///
    /// Unknown or missing event names, malformed JSON and empty task ids
    /// are [`CallError::Decode`]. Heartbeat bodies are not inspected.
    pub fn decode(frame: &SseFrame) -> Result<Self, CallError> {
        match frame.event.as_deref() {
            Some(STATUS_EVENT) => {
                let snap: TaskSnapshot = serde_json::from_str(&frame.data)?;
                if snap.id.trim().is_empty() {
                    return Err(CallError::decode("status event without task id"));
                }
                Ok(StreamEvent::Status(snap))
            }
            Some(HEARTBEAT_EVENT) => Ok(StreamEvent::Heartbeat),
            Some(other) => Err(CallError::decode(format!("unknown stream event {other:?}"))),
            None => Err(CallError::decode("unnamed stream event")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskStatus;

    fn frame(event: Option<&str>, data: &str) -> SseFrame {
        SseFrame {
            event: event.map(str::to_string),
            data: data.to_string(),
        }
    }

    #[test]
    fn status_and_heartbeat_decode() {
        let ev = StreamEvent::decode(&frame(
            Some("status"),
            r#"{"id":"t1","status":"running","progress":40,"label":"Import","tenant":"acme"}"#,
        ))
        .unwrap();
        let StreamEvent::Status(snap) = ev else {
            panic!("expected status");
        };
        assert_eq!(snap.status, TaskStatus::Running);
        assert_eq!(snap.progress, 40);

        assert_eq!(
            StreamEvent::decode(&frame(Some("heartbeat"), "ping")).unwrap(),
            StreamEvent::Heartbeat
        );
    }

    #[test]
    fn malformed_frames_are_decode_errors() {
        for f in [
            frame(Some("status"), "{not json"),
            frame(Some("status"), r#"{"id":"","status":"queued"}"#),
            frame(Some("progress"), "{}"),
            frame(None, r#"{"id":"t1","status":"queued"}"#),
        ] {
            let err = StreamEvent::decode(&f).unwrap_err();
            assert_eq!(err.as_label(), "call_decode", "{f:?}");
        }
    }
}
