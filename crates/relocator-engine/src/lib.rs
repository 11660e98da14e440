//! Filesystem backend for relocator.
//!
//! This crate provides the concrete collaborators a relocation runs against:
//! a transfer engine that copies and deletes directory trees on the local
//! filesystem, a TOML-backed root directory preference, and the push channel
//! the engine reports progress on.

mod channel;
mod engine;
mod preference;
mod tree;

pub use channel::EventChannel;
pub use engine::{FsTransferEngine, TransferOptions};
pub use preference::{CachedPreferenceStore, FilePreferenceStore};
