//! Key-value storage trait abstraction.

use async_trait::async_trait;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backing store cannot be used at all
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Writing the value would exceed the configured quota
    #[error("storage quota exceeded writing {key:?}: {size} bytes over a {limit} byte limit")]
    QuotaExceeded {
        /// Key being written
        key: String,
        /// Resulting size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },

    /// Key cannot be stored
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A per-profile string key-value store.
///
/// Mirrors the browser storage the application was designed around: string
/// keys, string values, whole-value replacement and a `clear` that wipes the
/// entire key space. Every `set` bumps a per-key revision so writers can detect
/// that someone else wrote in between their read and their write.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `None` if the key was never written or was removed.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace a value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// All stored keys, sorted.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Remove every key.
    async fn clear(&self) -> Result<()>;

    /// Number of writes seen by `key`; 0 if never written.
    async fn revision(&self, key: &str) -> Result<u64>;
}

pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
