//! Local filesystem transfer engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use relocator_core::{
    BoxFuture, ChannelEvent, PreferenceStore, RelocatorConfig, TransferEngine, TransferError,
};

use crate::channel::EventChannel;
use crate::tree::{self, TreePlan};

/// Options for filesystem transfers.
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    /// Move deleted directories to the trash instead of removing them.
    pub use_trash: bool,
    /// Refuse destinations that already contain entries.
    pub require_empty_destination: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            use_trash: false,
            require_empty_destination: true,
        }
    }
}

impl From<&RelocatorConfig> for TransferOptions {
    fn from(config: &RelocatorConfig) -> Self {
        Self {
            use_trash: config.use_trash,
            require_empty_destination: config.require_empty_destination,
        }
    }
}

/// Transfer engine that copies and deletes trees on the local filesystem.
///
/// A successful relocation persists the new root through the preference
/// store; progress is published on the event channel as one unit per file.
pub struct FsTransferEngine {
    store: Arc<dyn PreferenceStore>,
    events: EventChannel,
    options: TransferOptions,
}

impl FsTransferEngine {
    pub fn new(store: Arc<dyn PreferenceStore>, events: EventChannel, options: TransferOptions) -> Self {
        Self {
            store,
            events,
            options,
        }
    }

    async fn relocate_impl(&self, destination: &Path, copy_existing: bool) -> Result<(), TransferError> {
        let current = self.store.get()?;
        let destination = destination.to_path_buf();

        let checked = {
            let (current, destination) = (current.clone(), destination.clone());
            let options = self.options;
            blocking(move || validate_destination(&current, &destination, options)).await?
        };

        if copy_existing && checked.source_exists {
            self.copy_tree(&current, &destination).await?;
        } else {
            let dest = destination.clone();
            blocking(move || fs::create_dir_all(&dest).map_err(|e| TransferError::io(&dest, e)))
                .await?;
            if copy_existing {
                tracing::debug!(
                    target: "transfer",
                    root = %current.display(),
                    "Current root does not exist, nothing to copy"
                );
            }
        }

        self.store.set(&destination)?;
        tracing::info!(
            target: "transfer",
            from = %current.display(),
            to = %destination.display(),
            copied = copy_existing,
            "Root directory relocated"
        );
        Ok(())
    }

    /// Copy every directory and file under `source` into `dest`.
    async fn copy_tree(&self, source: &Path, dest: &Path) -> Result<(), TransferError> {
        let plan = {
            let source = source.to_path_buf();
            blocking(move || TreePlan::collect(&source)).await?
        };
        let total = plan.total_units();
        self.events.publish(ChannelEvent::progress(0, total));

        let dirs: Vec<PathBuf> = plan.dirs.iter().map(|d| dest.join(d)).collect();
        let root = dest.to_path_buf();
        blocking(move || {
            fs::create_dir_all(&root).map_err(|e| TransferError::io(&root, e))?;
            for dir in &dirs {
                fs::create_dir_all(dir).map_err(|e| TransferError::io(dir, e))?;
            }
            Ok(())
        })
        .await?;

        let mut bytes_copied = 0u64;
        for (done, relative) in plan.files.iter().enumerate() {
            let from = source.join(relative);
            let to = dest.join(relative);
            bytes_copied += blocking(move || tree::copy_file(&from, &to)).await?;
            self.events.publish(ChannelEvent::progress(done as u64 + 1, total));
        }

        tracing::debug!(
            target: "transfer",
            files = total,
            bytes = bytes_copied,
            expected_bytes = plan.bytes,
            "Copied root directory contents"
        );
        Ok(())
    }

    async fn delete_impl(&self, path: &Path) -> Result<(), TransferError> {
        let current = tree::resolve(&self.store.get()?);
        let target = tree::resolve(path);
        if current.starts_with(&target) {
            return Err(TransferError::invalid_destination(
                path,
                "refusing to delete the current root directory",
            ));
        }

        let path = path.to_path_buf();
        if self.options.use_trash {
            blocking(move || {
                if fs::symlink_metadata(&path).is_err() {
                    return Ok(());
                }
                trash::delete(&path)
                    .map_err(|e| TransferError::other(format!("Failed to move to trash: {e}")))
            })
            .await?;
        } else {
            blocking(move || tree::remove_path(&path)).await?;
        }

        tracing::info!(target: "transfer", path = %target.display(), "Old root directory deleted");
        Ok(())
    }
}

impl TransferEngine for FsTransferEngine {
    fn relocate<'a>(
        &'a self,
        destination: &'a Path,
        copy_existing: bool,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        Box::pin(self.relocate_impl(destination, copy_existing))
    }

    fn delete<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<(), TransferError>> {
        Box::pin(self.delete_impl(path))
    }
}

/// Outcome of destination validation.
struct CheckedDestination {
    /// Whether the current root exists and has anything to copy.
    source_exists: bool,
}

/// Reject destinations that cannot become the new root.
fn validate_destination(
    current: &Path,
    destination: &Path,
    options: TransferOptions,
) -> Result<CheckedDestination, TransferError> {
    if destination.as_os_str().is_empty() {
        return Err(TransferError::invalid_destination(destination, "path is empty"));
    }

    let current_resolved = tree::resolve(current);
    let dest_resolved = tree::resolve(destination);

    if dest_resolved == current_resolved {
        return Err(TransferError::invalid_destination(
            destination,
            "already the root directory",
        ));
    }
    if dest_resolved.starts_with(&current_resolved) {
        return Err(TransferError::invalid_destination(
            destination,
            "inside the current root directory",
        ));
    }
    if current_resolved.starts_with(&dest_resolved) {
        return Err(TransferError::invalid_destination(
            destination,
            "contains the current root directory",
        ));
    }

    match fs::metadata(destination) {
        Ok(metadata) if !metadata.is_dir() => {
            return Err(TransferError::invalid_destination(
                destination,
                "not a directory",
            ));
        }
        Ok(_) => {
            if options.require_empty_destination && !tree::is_empty_dir(destination)? {
                return Err(TransferError::DestinationNotEmpty {
                    path: destination.to_path_buf(),
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(TransferError::io(destination, e)),
    }

    Ok(CheckedDestination {
        source_exists: current.is_dir(),
    })
}

/// Run filesystem work on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, TransferError>
where
    F: FnOnce() -> Result<T, TransferError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TransferError::Task {
            message: e.to_string(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_nested_destination() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(&root).unwrap();

        let options = TransferOptions::default();
        assert!(validate_destination(&root, &root, options).is_err());
        assert!(validate_destination(&root, &root.join("inner"), options).is_err());
        assert!(validate_destination(&root, dir.path(), options).is_err());
        assert!(validate_destination(&root, Path::new(""), options).is_err());
        assert!(validate_destination(&root, &dir.path().join("sibling"), options).is_ok());
    }

    #[test]
    fn test_validate_non_empty_destination() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let dest = dir.path().join("dest");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("existing.txt"), "x").unwrap();

        let strict = TransferOptions::default();
        assert!(matches!(
            validate_destination(&root, &dest, strict),
            Err(TransferError::DestinationNotEmpty { .. })
        ));

        let relaxed = TransferOptions {
            require_empty_destination: false,
            ..strict
        };
        assert!(validate_destination(&root, &dest, relaxed).is_ok());
        assert!(validate_destination(&root, &dest.join("existing.txt"), relaxed).is_err());
    }
}
