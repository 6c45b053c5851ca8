use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for CouchDB store internals.
pub type CouchResult<T> = Result<T, CouchError>;

/// Failures of the CouchDB room store.
#[derive(Debug, Error)]
pub enum CouchError {
    /// No server configured.
    #[error("COUCH_BASE_URL is not set")]
    MissingBaseUrl,
    /// The HTTP client could not be built.
    #[error("cannot build CouchDB HTTP client")]
    Client {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The request never got a response.
    #[error("CouchDB request to `{target}` failed")]
    Transport {
        /// Path that was requested.
        target: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status.
    #[error("CouchDB answered {status} for `{target}`")]
    Status {
        /// Path that was requested.
        target: String,
        /// Status returned by the server.
        status: StatusCode,
    },
    /// The `_rev` sent with a write is no longer current.
    #[error("CouchDB revision conflict on `{target}`")]
    Conflict {
        /// Document path.
        target: String,
    },
    /// The body did not match the expected document shape.
    #[error("unreadable CouchDB response for `{target}`")]
    Decode {
        /// Path that was requested.
        target: String,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },
}
