//! Temp Store: scoped registry of named temporary files with guaranteed
//! cleanup (§4.4).
//!
//! Registration under the same logical name is idempotent within a run: the
//! first call creates the file and returns its path, later calls with the
//! same name return the same path without touching the filesystem again.

use crate::error::DriverResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Driver-owned registry. Every entry it creates is removed when the store
/// is dropped, regardless of whether `run()` returned `Ok` or `Err`.
pub struct TempStore {
    dir: PathBuf,
    entries: Mutex<HashMap<String, NamedTempFile>>,
}

impl TempStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        TempStore {
            dir: dir.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register (or look up) a temp file for `name`, returning its path.
    /// `name` becomes the file's prefix, matching the `outsam-<oid>` /
    /// `<input-dump-prefix><oid>` naming convention in §6.
    pub fn register(&self, name: &str) -> DriverResult<PathBuf> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(name) {
            return Ok(existing.path().to_path_buf());
        }
        let file = tempfile::Builder::new()
            .prefix(name)
            .tempfile_in(&self.dir)?;
        let path = file.path().to_path_buf();
        entries.insert(name.to_string(), file);
        Ok(path)
    }

    /// Number of files currently tracked (test/diagnostic hook).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_creates_a_file_under_the_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempStore::new(dir.path());
        let path = store.register("outsam-0").unwrap();
        assert!(path.exists());
        assert!(path.starts_with(dir.path()));
    }

    #[test]
    fn repeated_registration_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempStore::new(dir.path());
        let first = store.register("outsam-0").unwrap();
        let second = store.register("outsam-0").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn files_are_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let store = TempStore::new(dir.path());
            store.register("outsam-0").unwrap()
        };
        assert!(!path.exists());
    }
}
