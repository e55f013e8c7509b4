//! String-keyed persistence abstraction.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A flat string-keyed store: browser local storage, a directory of files,
/// or an in-memory map. The document manager reads and writes whole values
/// and never assumes anything about key enumeration order.
pub trait KeyValueStore {
    /// Read a value. Absent keys yield `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> StoreResult<()>;

    /// All keys currently present, in no particular order.
    fn keys(&self) -> Vec<String>;
}
