//! Rooms stored as one MongoDB document each, guarded by a version field.

mod config;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::MongoStoreError;
pub use store::MongoRoomStore;

use crate::dao::storage::StorageError;

impl From<MongoStoreError> for StorageError {
    fn from(err: MongoStoreError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
