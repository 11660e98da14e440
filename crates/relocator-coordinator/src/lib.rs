//! Root directory relocation coordinator.
//!
//! A [`Coordinator`] walks one relocation at a time through its phases:
//! staging a destination, waiting for the user to confirm, handing the
//! transfer to the backend, recovering from failures and finally cleaning
//! up the old directory. Progress pushed by the backend is picked up by a
//! separate listener whose lifetime is tied to a [`Subscription`].
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo(coordinator: relocator_coordinator::Coordinator,
//! #               events: tokio::sync::broadcast::Receiver<relocator_core::ChannelEvent>) {
//! let _subscription = coordinator.listen(events);
//!
//! coordinator.start("/mnt/storage/app-data").unwrap();
//! // ...ask the user whether to copy the existing contents...
//! coordinator.confirm(true).await.unwrap();
//!
//! if coordinator.snapshot().pending_delete_directory().is_some() {
//!     coordinator.clear_old_dir().await;
//! }
//! # }
//! ```

mod coordinator;
mod listener;

pub use coordinator::{CleanupOutcome, Coordinator};
pub use listener::Subscription;

// Re-export core types for convenience
pub use relocator_core::{
    RelocationError, RelocationRecord, TransferProgress, TransferState, TransferStateKind,
};
