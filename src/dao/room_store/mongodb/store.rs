use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use mongodb::{
    Collection, Database, IndexModel,
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{
    config::MongoConfig,
    error::{MongoResult, MongoStoreError},
    models::{MongoRoomDocument, doc_id, doc_id_at_version},
};
use crate::dao::{
    models::RoomEntity,
    room_store::RoomStore,
    storage::{StorageError, StorageResult},
};

const ROOMS: &str = "rooms";
const DUPLICATE_KEY: i32 = 11000;

const ROOM_EXPIRY_INDEX: &str = "room_updated_at_ttl";
/// Rooms untouched for this long are purged by the server.
const ROOM_TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn room_expiry_index() -> IndexModel {
    IndexModel::builder()
        .keys(doc! { "updated_at": 1 })
        .options(
            IndexOptions::builder()
                .name(Some(ROOM_EXPIRY_INDEX.to_owned()))
                .expire_after(Some(ROOM_TTL))
                .build(),
        )
        .build()
}

/// MongoDB-backed [`RoomStore`]. Cheap to clone.
#[derive(Clone)]
pub struct MongoRoomStore {
    config: Arc<MongoConfig>,
    database: Arc<RwLock<Database>>,
}

impl MongoRoomStore {
    /// Connect, wait for the server and make sure the `rooms` indexes exist.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_, database) = config.open().await?;
        let store = Self {
            config: Arc::new(config),
            database: Arc::new(RwLock::new(database)),
        };
        store.ensure_indexes().await?;
        info!("MongoDB room store ready");
        Ok(store)
    }

    async fn rooms(&self) -> Collection<MongoRoomDocument> {
        self.database.read().await.collection(ROOMS)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        self.rooms()
            .await
            .create_index(room_expiry_index())
            .await
            .map_err(|source| MongoStoreError::Index {
                index: ROOM_EXPIRY_INDEX,
                source,
            })?;
        Ok(())
    }

    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoStoreError::Ping { source })?;
        Ok(())
    }

    async fn reopen(&self) -> MongoResult<()> {
        let (_, database) = self.config.open().await?;
        *self.database.write().await = database;
        Ok(())
    }

    async fn load(&self, id: String) -> MongoResult<Option<RoomEntity>> {
        let document = self
            .rooms()
            .await
            .find_one(doc_id(&id))
            .await
            .map_err(MongoStoreError::room("load", &id))?;
        Ok(document.map(Into::into))
    }

    async fn insert(&self, mut room: RoomEntity) -> StorageResult<RoomEntity> {
        room.version = 1;
        let document = MongoRoomDocument::from(room.clone());

        match self.rooms().await.insert_one(&document).await {
            Ok(_) => Ok(room),
            Err(err) if is_duplicate_key(&err) => Err(StorageError::AlreadyExists { id: room.id }),
            Err(err) => Err(MongoStoreError::room("insert", room.id)(err).into()),
        }
    }

    async fn replace(&self, mut room: RoomEntity) -> StorageResult<RoomEntity> {
        let id = room.id.clone();
        let expected = room.version;
        room.version = expected + 1;
        let document = MongoRoomDocument::from(room.clone());

        let result = self
            .rooms()
            .await
            .replace_one(doc_id_at_version(&id, expected), &document)
            .await
            .map_err(MongoStoreError::room("save", &id))?;

        if result.matched_count > 0 {
            return Ok(room);
        }

        // No match: either the room is gone or another writer bumped the version.
        match self.load(id.clone()).await? {
            None => Err(StorageError::NotFound { id }),
            Some(current) => {
                debug!(room_id = %id, expected, actual = current.version, "stale room save rejected");
                Err(StorageError::VersionConflict {
                    id,
                    expected,
                    actual: current.version,
                })
            }
        }
    }

    async fn remove(&self, id: String, version: u64) -> StorageResult<bool> {
        let result = self
            .rooms()
            .await
            .delete_one(doc_id_at_version(&id, version))
            .await
            .map_err(MongoStoreError::room("delete", &id))?;

        if result.deleted_count > 0 {
            return Ok(true);
        }

        match self.load(id.clone()).await? {
            None => Ok(false),
            Some(current) => Err(StorageError::VersionConflict {
                id,
                expected: version,
                actual: current.version,
            }),
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

impl RoomStore for MongoRoomStore {
    fn find_room(&self, id: String) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.load(id).await?) })
    }

    fn create_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<RoomEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert(room).await })
    }

    fn save_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<RoomEntity>> {
        let store = self.clone();
        Box::pin(async move { store.replace(room).await })
    }

    fn delete_room(&self, id: String, version: u64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.remove(id, version).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ping().await?) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.reopen().await?) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_index_purges_idle_rooms() {
        let index = room_expiry_index();
        assert_eq!(index.keys, doc! { "updated_at": 1 });

        let options = index.options.unwrap();
        assert_eq!(options.name.as_deref(), Some(ROOM_EXPIRY_INDEX));
        assert_eq!(options.expire_after, Some(Duration::from_secs(86_400)));
    }
}
