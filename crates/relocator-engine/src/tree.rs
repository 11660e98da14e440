//! Directory tree walking and copying.

use std::fs;
use std::path::{Path, PathBuf};

use relocator_core::TransferError;

/// Everything that has to be recreated under a new root.
#[derive(Debug, Default)]
pub(crate) struct TreePlan {
    /// Directories, relative to the source root, parents before children.
    pub dirs: Vec<PathBuf>,
    /// Regular files relative to the source root.
    pub files: Vec<PathBuf>,
    /// Total size of `files` in bytes.
    pub bytes: u64,
}

impl TreePlan {
    /// Walk `root` and record its directories and regular files.
    ///
    /// Symlinks and other special files are skipped.
    pub fn collect(root: &Path) -> Result<Self, TransferError> {
        let mut plan = Self::default();
        plan.walk(root, Path::new(""))?;
        Ok(plan)
    }

    fn walk(&mut self, root: &Path, relative: &Path) -> Result<(), TransferError> {
        let dir = root.join(relative);
        let entries = fs::read_dir(&dir).map_err(|e| TransferError::io(&dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| TransferError::io(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| TransferError::io(entry.path(), e))?;
            let child = relative.join(entry.file_name());

            if file_type.is_dir() {
                self.dirs.push(child.clone());
                self.walk(root, &child)?;
            } else if file_type.is_file() {
                let metadata = entry.metadata().map_err(|e| TransferError::io(entry.path(), e))?;
                self.bytes += metadata.len();
                self.files.push(child);
            }
        }

        Ok(())
    }

    /// Number of units reported as progress.
    pub fn total_units(&self) -> u64 {
        self.files.len() as u64
    }
}

/// Copy a single file, returning the bytes written.
pub(crate) fn copy_file(source: &Path, dest: &Path) -> Result<u64, TransferError> {
    fs::copy(source, dest).map_err(|e| TransferError::io(source, e))
}

/// Whether `dir` has no entries. A missing directory counts as empty.
pub(crate) fn is_empty_dir(dir: &Path) -> Result<bool, TransferError> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(TransferError::io(dir, e)),
    }
}

/// Remove a file or directory tree. A missing path is not an error.
pub(crate) fn remove_path(path: &Path) -> Result<(), TransferError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(TransferError::io(path, e)),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| TransferError::io(path, e))
}

/// Best-effort absolute form of `path` for containment checks.
///
/// Resolves symlinks through the deepest existing ancestor so that paths
/// which do not exist yet still compare against canonical ones.
pub(crate) fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut missing = Vec::new();
    let mut current = absolute.as_path();
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            missing.push(name.to_os_string());
        }
        if let Ok(canonical) = parent.canonicalize() {
            return missing.iter().rev().fold(canonical, |acc, name| acc.join(name));
        }
        current = parent;
    }

    absolute
}
