//! Entry store error types.

use crate::domain::UniqueId;

/// Errors that can occur when reading or writing config entries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An entry with this id already exists
    #[error("entry {0} already exists")]
    Duplicate(UniqueId),

    /// Filesystem operation failed
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Stored file doesn't parse, or entries don't serialize
    #[error("JSON error: {message}")]
    Json { message: String },
}
