//! The relocation state machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use relocator_core::{
    CacheInvalidator, ChannelEvent, PendingDelete, PreferenceStore, RelocationError,
    RelocationRecord, TransferEngine, TransferProgress, TransferState, TransferStateKind,
};

use crate::listener::{self, Subscription};

/// Result of a [`Coordinator::clear_old_dir`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The old directory was deleted.
    Deleted,
    /// Deletion failed; the old directory is still pending and can be retried.
    Retained,
    /// Nothing pending, or a deletion is already outstanding.
    Skipped,
}

/// Coordinates relocating the root directory.
///
/// Cloning yields another handle to the same record. Every transition is a
/// single update of the shared record, so observers never see a partially
/// applied change.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    record: watch::Sender<RelocationRecord>,
    store: Arc<dyn PreferenceStore>,
    invalidator: Arc<dyn CacheInvalidator>,
    engine: Arc<dyn TransferEngine>,
}

impl Coordinator {
    /// Create a coordinator in the Idle state.
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        invalidator: Arc<dyn CacheInvalidator>,
        engine: Arc<dyn TransferEngine>,
    ) -> Self {
        let (record, _) = watch::channel(RelocationRecord::default());
        Self {
            inner: Arc::new(Inner {
                record,
                store,
                invalidator,
                engine,
            }),
        }
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> RelocationRecord {
        self.inner.record.borrow().clone()
    }

    /// Current phase.
    pub fn state(&self) -> TransferStateKind {
        self.inner.record.borrow().kind()
    }

    /// Observe record changes.
    pub fn watch(&self) -> watch::Receiver<RelocationRecord> {
        self.inner.record.subscribe()
    }

    /// Stage `destination` and wait for confirmation.
    ///
    /// Rejected while a relocation is running, since the outstanding
    /// transfer would otherwise be attributed to the new destination.
    pub fn start(&self, destination: impl Into<PathBuf>) -> Result<(), RelocationError> {
        let destination = destination.into();
        let previous = self.read_root();

        let mut in_flight = None;
        self.inner.record.send_if_modified(|record| {
            if let TransferState::Loading { target, .. } = &record.state {
                in_flight = Some(target.clone());
                return false;
            }
            record.previous_directory = previous;
            record.pending_delete = None;
            record.state = TransferState::Confirm {
                target: destination.clone(),
            };
            true
        });

        if let Some(target) = in_flight {
            tracing::warn!(
                target: "relocation",
                requested = %destination.display(),
                running = %target.display(),
                "Cannot stage a destination while a relocation is running"
            );
            return Err(RelocationError::TransferInFlight { target });
        }

        tracing::debug!(target: "relocation", destination = %destination.display(), "Destination staged");
        Ok(())
    }

    /// Submit the staged destination to the transfer engine.
    ///
    /// Backend failures do not surface here: they move the record to the
    /// Error state with the destination still staged, so confirming again
    /// retries. Returns the phase the relocation resolved to.
    pub async fn confirm(&self, copy_existing: bool) -> Result<TransferStateKind, RelocationError> {
        let mut staged = None;
        self.inner.record.send_if_modified(|record| {
            let Some(target) = record.target_directory().map(Path::to_path_buf) else {
                return false;
            };
            record.state = TransferState::Loading {
                target: target.clone(),
                copy_existing,
            };
            record.progress = TransferProgress::default();
            staged = Some(target);
            true
        });

        let Some(target) = staged else {
            tracing::warn!(target: "relocation", "Confirm called with no destination staged");
            return Err(RelocationError::NoDestinationStaged);
        };

        tracing::info!(
            target: "relocation",
            destination = %target.display(),
            copy_existing,
            "Relocation started"
        );

        let kind = match self.inner.engine.relocate(&target, copy_existing).await {
            Ok(()) => self.commit_success(&target),
            Err(e) => self.commit_failure(&target, e.to_string()),
        };
        Ok(kind)
    }

    fn commit_success(&self, target: &Path) -> TransferStateKind {
        // The engine has persisted the new root even if this success loses the tie-break.
        self.inner.invalidator.invalidate(self.inner.store.key());

        let mut kind = TransferStateKind::Success;
        let mut duplicate = false;
        self.inner.record.send_if_modified(|record| {
            if let TransferState::Error { message, .. } = &record.state {
                tracing::warn!(
                    target: "relocation",
                    destination = %target.display(),
                    error = %message,
                    "Ignoring stale success, a newer attempt already failed"
                );
                kind = TransferStateKind::Error;
                return false;
            }
            // An overlapping attempt on the same target already committed;
            // shuffling again would queue the live root for deletion.
            if matches!(record.state, TransferState::Success | TransferState::Delete)
                && record.previous_directory.as_deref() == Some(target)
            {
                tracing::debug!(
                    target: "relocation",
                    destination = %target.display(),
                    "Ignoring duplicate success, relocation already committed"
                );
                duplicate = true;
                return false;
            }
            record.pending_delete = record.previous_directory.take().map(PendingDelete::new);
            record.previous_directory = Some(target.to_path_buf());
            record.state = TransferState::Success;
            true
        });

        if kind == TransferStateKind::Success && !duplicate {
            tracing::info!(target: "relocation", destination = %target.display(), "Relocation succeeded");
        }
        kind
    }

    fn commit_failure(&self, target: &Path, message: String) -> TransferStateKind {
        tracing::warn!(
            target: "relocation",
            destination = %target.display(),
            error = %message,
            "Relocation failed"
        );
        self.inner.record.send_modify(|record| {
            record.state = TransferState::Error {
                target: target.to_path_buf(),
                message,
            };
            record.pending_delete = None;
        });
        TransferStateKind::Error
    }

    /// Delete the directory left behind by the last successful relocation.
    ///
    /// At most one deletion is outstanding; concurrent calls are skipped.
    pub async fn clear_old_dir(&self) -> CleanupOutcome {
        let mut claimed = None;
        self.inner.record.send_if_modified(|record| match record.pending_delete.as_mut() {
            Some(pending) if !pending.deleting => {
                pending.deleting = true;
                claimed = Some(pending.path.clone());
                true
            }
            _ => false,
        });

        let Some(path) = claimed else {
            tracing::debug!(target: "relocation", "Nothing to clean up or cleanup already running");
            return CleanupOutcome::Skipped;
        };

        match self.inner.engine.delete(&path).await {
            Ok(()) => {
                let applied = self.inner.record.send_if_modified(|record| {
                    if record.pending_delete_directory() != Some(path.as_path()) {
                        return false;
                    }
                    record.pending_delete = None;
                    record.state = TransferState::Delete;
                    true
                });
                if !applied {
                    tracing::debug!(
                        target: "relocation",
                        path = %path.display(),
                        "Record changed while deleting, leaving it as is"
                    );
                }
                tracing::info!(target: "relocation", path = %path.display(), "Old directory removed");
                CleanupOutcome::Deleted
            }
            Err(e) => {
                tracing::warn!(
                    target: "relocation",
                    path = %path.display(),
                    error = %e,
                    "Failed to remove old directory, keeping it for a retry"
                );
                self.inner.record.send_if_modified(|record| match record.pending_delete.as_mut() {
                    Some(pending) if pending.path == path => {
                        pending.deleting = false;
                        true
                    }
                    _ => false,
                });
                CleanupOutcome::Retained
            }
        }
    }

    /// Subscribe to progress events on `events`.
    ///
    /// Also records the current root as the previous directory if none is
    /// known yet. Must be called within a Tokio runtime.
    pub fn listen(&self, events: broadcast::Receiver<ChannelEvent>) -> Subscription {
        if self.inner.record.borrow().previous_directory.is_none() {
            if let Some(root) = self.read_root() {
                self.inner.record.send_if_modified(|record| {
                    if record.previous_directory.is_some() {
                        return false;
                    }
                    record.previous_directory = Some(root);
                    true
                });
            }
        }

        Subscription::spawn(self.clone(), events)
    }

    /// Return the record to its initial Idle shape.
    pub fn reset(&self) {
        self.inner.record.send_replace(RelocationRecord::default());
        tracing::debug!(target: "relocation", "Relocation record reset");
    }

    /// Apply one channel event to the record.
    pub(crate) fn apply_event(&self, event: &ChannelEvent) {
        listener::apply_event(&self.inner.record, event);
    }

    fn read_root(&self) -> Option<PathBuf> {
        match self.inner.store.get() {
            Ok(root) => Some(root),
            Err(e) => {
                tracing::warn!(target: "relocation", error = %e, "Failed to read root directory");
                None
            }
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("record", &*self.inner.record.borrow())
            .finish_non_exhaustive()
    }
}
