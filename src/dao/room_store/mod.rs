#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::RoomEntity;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for room snapshots.
///
/// Writes are optimistic: `create_room` only inserts, while `save_room` and `delete_room` only
/// touch the stored snapshot when its version still equals the version the caller read.
pub trait RoomStore: Send + Sync {
    /// Load the full snapshot, `None` when the room does not exist.
    fn find_room(&self, id: String) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Insert a new room at version 1; `AlreadyExists` when the id is taken.
    fn create_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<RoomEntity>>;
    /// Replace the snapshot stored at `room.version` and return it at the next version.
    fn save_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<RoomEntity>>;
    /// Remove the room if it is still at `version`.
    ///
    /// Returns `false` when the room is already gone and `VersionConflict` when it moved on.
    fn delete_room(&self, id: String, version: u64) -> BoxFuture<'static, StorageResult<bool>>;
    /// Cheap liveness check of the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection in place.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
