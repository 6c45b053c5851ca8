use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias for MongoDB store internals.
pub type MongoResult<T> = Result<T, MongoStoreError>;

/// Failures of the MongoDB room store.
#[derive(Debug, Error)]
pub enum MongoStoreError {
    /// No connection string configured.
    #[error("MONGO_URI is not set")]
    MissingUri,
    /// The connection string could not be parsed.
    #[error("invalid MongoDB URI `{uri}`")]
    InvalidUri {
        /// Rejected connection string.
        uri: String,
        /// Parser error.
        #[source]
        source: MongoError,
    },
    /// The driver client could not be built.
    #[error("cannot build MongoDB client")]
    Client {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Every startup ping failed.
    #[error("MongoDB unreachable after {attempts} ping(s)")]
    Unreachable {
        /// Pings sent before giving up.
        attempts: u32,
        /// Error of the last ping.
        #[source]
        source: MongoError,
    },
    /// A health ping failed.
    #[error("MongoDB ping failed")]
    Ping {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Index creation failed.
    #[error("cannot create index `{index}` on `rooms`")]
    Index {
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A room query or write failed; `action` names the operation.
    #[error("cannot {action} room `{id}`")]
    Room {
        /// Operation that failed.
        action: &'static str,
        /// Room code.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}

impl MongoStoreError {
    pub(super) fn room(action: &'static str, id: impl Into<String>) -> impl FnOnce(MongoError) -> Self {
        let id = id.into();
        move |source| MongoStoreError::Room { action, id, source }
    }
}
