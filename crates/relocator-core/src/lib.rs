//! Core types and traits for relocator.
//!
//! This crate provides the data model of a root directory relocation
//! (the transfer state machine's record, progress samples and channel
//! events), the error types, the configuration, and the traits the
//! coordinator uses to reach its collaborators.

mod backend;
mod config;
mod error;
mod event;
mod state;

pub use backend::{BoxFuture, CacheInvalidator, PreferenceStore, TransferEngine};
pub use config::{RelocatorConfig, RelocatorConfigBuilder};
pub use error::{ConfigError, PreferenceError, RelocationError, TransferError};
pub use event::{ChannelEvent, ProgressPayload, PROGRESS_KIND};
pub use state::{PendingDelete, RelocationRecord, TransferProgress, TransferState, TransferStateKind};

/// Default buffer size for the relocation event channel.
pub const EVENT_CHANNEL_SIZE: usize = 100;
