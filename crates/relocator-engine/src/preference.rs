//! Root directory preference backed by a TOML settings file.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use relocator_core::{CacheInvalidator, PreferenceError, PreferenceStore, RelocatorConfig};

/// Stores the root directory under one key of a TOML settings file.
///
/// Other keys in the file belong to unrelated settings and are preserved.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    key: String,
    default_root: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePreferenceStore {
    /// Create a store for `key` in the settings file at `path`.
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>, default_root: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
            default_root: default_root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store from the relocator config.
    pub fn from_config(config: &RelocatorConfig) -> Self {
        Self::new(
            &config.settings_path,
            &config.preference_key,
            &config.default_root,
        )
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<toml::Table, PreferenceError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(toml::Table::new()),
            Err(source) => {
                return Err(PreferenceError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        toml::from_str(&content).map_err(|source| PreferenceError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write_table(&self, table: &toml::Table) -> Result<(), PreferenceError> {
        let io_err = |source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = toml::to_string_pretty(table)?;

        // Write beside the target and rename so readers never see a partial file.
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, content).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self) -> Result<PathBuf, PreferenceError> {
        let table = self.read_table()?;
        match table.get(&self.key) {
            Some(toml::Value::String(path)) if !path.is_empty() => Ok(PathBuf::from(path)),
            Some(other) => {
                tracing::warn!(
                    target: "preference",
                    key = %self.key,
                    "Ignoring non-path value {other}, using default root"
                );
                Ok(self.default_root.clone())
            }
            None => Ok(self.default_root.clone()),
        }
    }

    fn set(&self, path: &Path) -> Result<(), PreferenceError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut table = self.read_table()?;
        table.insert(
            self.key.clone(),
            toml::Value::String(path.to_string_lossy().into_owned()),
        );
        self.write_table(&table)
    }

    fn key(&self) -> &str {
        &self.key
    }
}

/// Caches reads of another store until invalidated by key.
#[derive(Debug)]
pub struct CachedPreferenceStore<S> {
    inner: S,
    cached: RwLock<Option<PathBuf>>,
}

impl<S: PreferenceStore> CachedPreferenceStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cached: RwLock::new(None),
        }
    }

    /// Whether a value is currently cached.
    pub fn is_cached(&self) -> bool {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: PreferenceStore> PreferenceStore for CachedPreferenceStore<S> {
    fn get(&self) -> Result<PathBuf, PreferenceError> {
        if let Some(path) = self
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(path.clone());
        }

        let path = self.inner.get()?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(path.clone());
        Ok(path)
    }

    fn set(&self, path: &Path) -> Result<(), PreferenceError> {
        self.inner.set(path)?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(path.to_path_buf());
        Ok(())
    }

    fn key(&self) -> &str {
        self.inner.key()
    }
}

impl<S: PreferenceStore> CacheInvalidator for CachedPreferenceStore<S> {
    fn invalidate(&self, key: &str) {
        if key != self.inner.key() {
            return;
        }
        tracing::debug!(target: "preference", key, "Invalidating cached preference");
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path().join("settings.toml"), "root_directory", "/default");

        assert_eq!(store.get().unwrap(), PathBuf::from("/default"));
    }

    #[test]
    fn test_set_preserves_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "theme = \"dark\"\n").unwrap();

        let store = FilePreferenceStore::new(&path, "root_directory", "/default");
        store.set(Path::new("/data/new")).unwrap();

        assert_eq!(store.get().unwrap(), PathBuf::from("/data/new"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("theme = \"dark\""));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_get_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "root_directory = [unterminated").unwrap();

        let store = FilePreferenceStore::new(&path, "root_directory", "/default");
        assert!(matches!(store.get(), Err(PreferenceError::Parse { .. })));
    }

    #[test]
    fn test_cache_invalidated_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let cached = CachedPreferenceStore::new(FilePreferenceStore::new(&path, "root_directory", "/default"));

        assert_eq!(cached.get().unwrap(), PathBuf::from("/default"));
        assert!(cached.is_cached());

        // Written behind the cache's back.
        cached.inner().set(Path::new("/elsewhere")).unwrap();
        assert_eq!(cached.get().unwrap(), PathBuf::from("/default"));

        cached.invalidate("unrelated");
        assert!(cached.is_cached());

        cached.invalidate("root_directory");
        assert!(!cached.is_cached());
        assert_eq!(cached.get().unwrap(), PathBuf::from("/elsewhere"));
    }
}
