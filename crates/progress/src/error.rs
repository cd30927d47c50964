//! Error type for the progress stores.

use defenders_core::KeyError;
use defenders_storage::StorageError;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors surfaced by the progress, settings, quiz and profile stores.
///
/// Corrupt persisted data is never reported here: it is recovered locally by
/// falling back to defaults.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// The backing store failed (unavailable, quota, I/O)
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Unknown mission or stage identifier
    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    /// Certificate requested before all missions were completed
    #[error("certificate is locked until all three missions are completed")]
    CertificateLocked,

    /// Rejected input value
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Failed to encode a value for storage
    #[error("failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),
}
