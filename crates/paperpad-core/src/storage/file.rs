//! File-backed store: one file per key under a base directory.

use std::fs;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, StoreError, StoreResult};

/// Store that maps each key to `<base>/<key>.json`.
///
/// Keys are sanitized to filename-safe characters; every key the engine
/// generates (`paper_<uuid>`, `last_paper_id`) survives the mapping
/// unchanged, so listing file stems recovers the original keys.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `base_path`, creating the directory if
    /// needed.
    pub fn new(base_path: PathBuf) -> StoreResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StoreError::Io(format!("failed to create store directory: {e}"))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create a store in the platform data directory.
    pub fn default_location() -> StoreResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StoreError::Io("could not determine home directory".to_string()))?;
        Self::new(base.join("paperpad").join("papers"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{safe}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.entry_path(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.entry_path(key);
        fs::write(&path, value)
            .map_err(|e| StoreError::Io(format!("failed to write {}: {e}", path.display())))
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        let path = self.entry_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| StoreError::Io(format!("failed to delete {}: {e}", path.display())))?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.base_path) else {
            return Vec::new();
        };

        entries
            .flatten()
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .map(|ext| ext == "json")
                    .unwrap_or(false)
            })
            .filter_map(|entry| {
                entry
                    .path()
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(|stem| stem.to_string())
            })
            .collect()
    }
}
