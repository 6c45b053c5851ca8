use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend failed or could not be reached.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Backend-specific description.
        message: String,
        /// Original backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A room with the same identifier was created first.
    #[error("room `{id}` already exists")]
    AlreadyExists {
        /// Room code.
        id: String,
    },
    /// The room vanished between read and write.
    #[error("room `{id}` not found")]
    NotFound {
        /// Room code.
        id: String,
    },
    /// The stored snapshot moved on since the caller read it.
    #[error("room `{id}` was modified concurrently (expected version {expected}, stored {actual})")]
    VersionConflict {
        /// Room code.
        id: String,
        /// Version the caller based its write on.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Whether a fresh read followed by a retry may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::AlreadyExists { .. } | StorageError::VersionConflict { .. }
        )
    }
}
