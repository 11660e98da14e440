//! Traits for the collaborators a relocation is coordinated against.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::{PreferenceError, TransferError};

/// A boxed future for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Store holding the configured root directory.
///
/// The coordinator only reads it; the transfer engine persists the new
/// value when a relocation succeeds.
pub trait PreferenceStore: Send + Sync {
    /// Current effective root directory.
    fn get(&self) -> Result<PathBuf, PreferenceError>;

    /// Persist a new root directory.
    fn set(&self, path: &Path) -> Result<(), PreferenceError>;

    /// Identifier used to invalidate cached reads of this preference.
    fn key(&self) -> &str;
}

/// Receives notifications that cached preference reads are stale.
pub trait CacheInvalidator: Send + Sync {
    /// Drop any cached value stored under `key`.
    fn invalidate(&self, key: &str);
}

/// Backend that moves and deletes root directories.
///
/// Progress for an outstanding `relocate` is pushed on the event channel,
/// not returned here.
pub trait TransferEngine: Send + Sync {
    /// Make `destination` the new root, copying the current contents first
    /// when `copy_existing` is set.
    fn relocate<'a>(
        &'a self,
        destination: &'a Path,
        copy_existing: bool,
    ) -> BoxFuture<'a, Result<(), TransferError>>;

    /// Delete a directory tree.
    fn delete<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<(), TransferError>>;
}
