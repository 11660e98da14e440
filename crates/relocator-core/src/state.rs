//! Relocation state types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Phase of a relocation, carrying the fields that are legal in that phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TransferState {
    /// Nothing staged.
    #[default]
    Idle,
    /// A destination is staged and waiting for the user to confirm.
    Confirm { target: PathBuf },
    /// The backend is relocating to `target`.
    Loading { target: PathBuf, copy_existing: bool },
    /// The last relocation to `target` failed; confirming again retries it.
    Error { target: PathBuf, message: String },
    /// The relocation succeeded.
    Success,
    /// The old directory was cleaned up.
    Delete,
}

impl TransferState {
    /// The fieldless kind of this state.
    pub fn kind(&self) -> TransferStateKind {
        match self {
            Self::Idle => TransferStateKind::Idle,
            Self::Confirm { .. } => TransferStateKind::Confirm,
            Self::Loading { .. } => TransferStateKind::Loading,
            Self::Error { .. } => TransferStateKind::Error,
            Self::Success => TransferStateKind::Success,
            Self::Delete => TransferStateKind::Delete,
        }
    }

    /// The staged destination, present only in Confirm, Loading and Error.
    pub fn target(&self) -> Option<&Path> {
        match self {
            Self::Confirm { target } | Self::Loading { target, .. } | Self::Error { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }
}

/// Fieldless mirror of [`TransferState`] for display and comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransferStateKind {
    Idle,
    Confirm,
    Loading,
    Error,
    Success,
    Delete,
}

/// Most recent progress sample reported by the transfer engine.
///
/// Values are forwarded verbatim; `completed_units <= total_units` is not enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    /// Units (files) transferred so far.
    pub completed_units: u64,
    /// Units (files) to transfer in total.
    pub total_units: u64,
}

impl TransferProgress {
    /// Create a progress sample.
    pub fn new(completed_units: u64, total_units: u64) -> Self {
        Self {
            completed_units,
            total_units,
        }
    }

    /// Completed share in `0.0..=1.0` (or above, if the backend over-reports).
    pub fn fraction(&self) -> f64 {
        if self.total_units > 0 {
            self.completed_units as f64 / self.total_units as f64
        } else {
            0.0
        }
    }
}

/// An old root directory retained after a successful relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDelete {
    /// Directory awaiting deletion.
    pub path: PathBuf,
    /// Set while a deletion request for `path` is outstanding.
    pub deleting: bool,
}

impl PendingDelete {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            deleting: false,
        }
    }
}

/// The coordinator's mutable state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationRecord {
    /// Current phase.
    #[serde(flatten)]
    pub state: TransferState,
    /// Root directory in effect before the in-flight or most recent relocation.
    pub previous_directory: Option<PathBuf>,
    /// Old root directory awaiting cleanup.
    pub pending_delete: Option<PendingDelete>,
    /// Most recent progress sample.
    pub progress: TransferProgress,
}

impl RelocationRecord {
    /// Current phase kind.
    pub fn kind(&self) -> TransferStateKind {
        self.state.kind()
    }

    pub fn target_directory(&self) -> Option<&Path> {
        self.state.target()
    }

    /// Failure detail, present only in the Error state.
    pub fn last_error(&self) -> Option<&str> {
        match &self.state {
            TransferState::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn pending_delete_directory(&self) -> Option<&Path> {
        self.pending_delete.as_ref().map(|p| p.path.as_path())
    }

    /// Whether a deletion of the old directory is outstanding.
    pub fn is_deleting(&self) -> bool {
        self.pending_delete.as_ref().is_some_and(|p| p.deleting)
    }

    /// Whether the record is in its initial shape.
    pub fn is_initial(&self) -> bool {
        *self == Self::default()
    }
}
