//! Rooms stored as CouchDB documents; `_rev` guards concurrent writes.

mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::CouchError;
pub use store::CouchRoomStore;

use crate::dao::storage::StorageError;

impl From<CouchError> for StorageError {
    fn from(err: CouchError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
