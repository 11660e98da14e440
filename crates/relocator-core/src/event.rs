//! Events carried on the relocation push channel.

use serde::{Deserialize, Serialize};

use crate::TransferProgress;

/// Event kind carrying a [`ProgressPayload`].
pub const PROGRESS_KIND: &str = "progress";

/// An event on the multiplexed push channel.
///
/// Other features share the channel, so consumers filter on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEvent {
    /// Event kind, e.g. `"progress"`.
    pub kind: String,
    /// Kind-specific payload.
    pub payload: serde_json::Value,
}

impl ChannelEvent {
    /// Create an event with an arbitrary kind and payload.
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Create a progress event.
    pub fn progress(completed: u64, total: u64) -> Self {
        Self::new(
            PROGRESS_KIND,
            serde_json::json!({ "completed": completed, "total": total }),
        )
    }

    /// Check if this is a progress event.
    pub fn is_progress(&self) -> bool {
        self.kind == PROGRESS_KIND
    }
}

/// Wire shape of a progress event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub completed: u64,
    pub total: u64,
}

impl ProgressPayload {
    /// Decode a payload, failing on missing or mistyped fields.
    pub fn decode(payload: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(payload)
    }
}

impl From<ProgressPayload> for TransferProgress {
    fn from(payload: ProgressPayload) -> Self {
        TransferProgress::new(payload.completed, payload.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_event_decodes() {
        let event = ChannelEvent::progress(40, 100);
        assert!(event.is_progress());

        let payload = ProgressPayload::decode(&event.payload).unwrap();
        assert_eq!(TransferProgress::from(payload), TransferProgress::new(40, 100));
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let missing = serde_json::json!({ "completed": 40 });
        assert!(ProgressPayload::decode(&missing).is_err());

        let negative = serde_json::json!({ "completed": -1, "total": 10 });
        assert!(ProgressPayload::decode(&negative).is_err());

        assert!(ProgressPayload::decode(&serde_json::Value::Null).is_err());
    }
}
