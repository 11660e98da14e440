//! Progress listener: projects channel events onto the relocation record.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use relocator_core::{ChannelEvent, ProgressPayload, RelocationRecord};

use crate::Coordinator;

/// Handle to a running progress listener.
///
/// The listener stops when the handle is cancelled or dropped.
#[derive(Debug)]
pub struct Subscription {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn spawn(coordinator: Coordinator, events: broadcast::Receiver<ChannelEvent>) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(coordinator, events, cancel.clone()));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Whether the listener is still receiving events.
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop listening.
    pub fn cancel(self) {
        // Drop does the work.
    }

    /// Stop listening and wait until the listener has exited.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(target: "relocation_progress", error = %e, "Progress listener task failed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    coordinator: Coordinator,
    mut events: broadcast::Receiver<ChannelEvent>,
    cancel: CancellationToken,
) {
    tracing::debug!(target: "relocation_progress", "Progress listener started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = events.recv() => match received {
                Ok(event) => coordinator.apply_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "relocation_progress", skipped, "Progress listener lagged");
                }
                Err(RecvError::Closed) => {
                    tracing::debug!(target: "relocation_progress", "Event channel closed");
                    break;
                }
            },
        }
    }

    tracing::debug!(target: "relocation_progress", "Progress listener stopped");
}

/// Store the payload of a progress event; ignore every other kind.
///
/// Malformed payloads are logged and dropped without touching the record.
pub(crate) fn apply_event(record: &watch::Sender<RelocationRecord>, event: &ChannelEvent) {
    if !event.is_progress() {
        return;
    }

    match ProgressPayload::decode(&event.payload) {
        Ok(payload) => record.send_modify(|r| r.progress = payload.into()),
        Err(e) => {
            tracing::warn!(
                target: "relocation_progress",
                error = %e,
                payload = %event.payload,
                "Dropping malformed progress event"
            );
        }
    }
}
