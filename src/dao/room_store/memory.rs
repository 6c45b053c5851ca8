//! Volatile room store backed by an in-process concurrent map.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;

use crate::dao::{
    models::RoomEntity,
    room_store::RoomStore,
    storage::{StorageError, StorageResult},
};

/// Room table living in process memory; rooms are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    rooms: Arc<DashMap<String, RoomEntity>>,
}

impl MemoryRoomStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&self, mut room: RoomEntity) -> StorageResult<RoomEntity> {
        match self.rooms.entry(room.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists { id: room.id }),
            Entry::Vacant(slot) => {
                room.version = 1;
                slot.insert(room.clone());
                Ok(room)
            }
        }
    }

    fn save(&self, mut room: RoomEntity) -> StorageResult<RoomEntity> {
        let Some(mut stored) = self.rooms.get_mut(&room.id) else {
            return Err(StorageError::NotFound { id: room.id });
        };

        if stored.version != room.version {
            return Err(StorageError::VersionConflict {
                id: room.id,
                expected: room.version,
                actual: stored.version,
            });
        }

        room.version += 1;
        *stored = room.clone();
        Ok(room)
    }

    fn delete(&self, id: String, version: u64) -> StorageResult<bool> {
        if self
            .rooms
            .remove_if(&id, |_, stored| stored.version == version)
            .is_some()
        {
            return Ok(true);
        }

        let actual = self.rooms.get(&id).map(|stored| stored.version);
        match actual {
            Some(actual) => Err(StorageError::VersionConflict {
                id,
                expected: version,
                actual,
            }),
            None => Ok(false),
        }
    }
}

impl RoomStore for MemoryRoomStore {
    fn find_room(&self, id: String) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let found = self.rooms.get(&id).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(found) })
    }

    fn create_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<RoomEntity>> {
        let result = self.create(room);
        Box::pin(async move { result })
    }

    fn save_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<RoomEntity>> {
        let result = self.save(room);
        Box::pin(async move { result })
    }

    fn delete_room(&self, id: String, version: u64) -> BoxFuture<'static, StorageResult<bool>> {
        let result = self.delete(id, version);
        Box::pin(async move { result })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::RoomStatusEntity;

    fn room(id: &str) -> RoomEntity {
        RoomEntity {
            id: id.into(),
            host_id: "p1".into(),
            status: RoomStatusEntity::Waiting,
            current_round_index: 0,
            movies: Vec::new(),
            timer: 10,
            round_start_time: None,
            players: Vec::new(),
            version: 0,
        }
    }

    #[tokio::test]
    async fn create_assigns_first_version_and_rejects_duplicates() {
        let store = MemoryRoomStore::new();
        let created = store.create_room(room("ABC123")).await.unwrap();
        assert_eq!(created.version, 1);

        let err = store.create_room(room("ABC123")).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn stale_save_is_rejected() {
        let store = MemoryRoomStore::new();
        let created = store.create_room(room("ABC123")).await.unwrap();

        let mut first = created.clone();
        first.timer = 9;
        let saved = store.save_room(first).await.unwrap();
        assert_eq!(saved.version, 2);

        let mut stale = created;
        stale.timer = 8;
        let err = store.save_room(stale).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));

        let stored = store.find_room("ABC123".into()).await.unwrap().unwrap();
        assert_eq!(stored.timer, 9);
    }

    #[tokio::test]
    async fn save_of_deleted_room_reports_not_found() {
        let store = MemoryRoomStore::new();
        let created = store.create_room(room("ABC123")).await.unwrap();
        assert!(store.delete_room("ABC123".into(), 1).await.unwrap());
        assert!(!store.delete_room("ABC123".into(), 1).await.unwrap());

        let err = store.save_room(created).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn stale_delete_keeps_the_room() {
        let store = MemoryRoomStore::new();
        let created = store.create_room(room("ABC123")).await.unwrap();
        store.save_room(created).await.unwrap();

        let err = store.delete_room("ABC123".into(), 1).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
        assert!(store.find_room("ABC123".into()).await.unwrap().is_some());

        assert!(store.delete_room("ABC123".into(), 2).await.unwrap());
    }
}
