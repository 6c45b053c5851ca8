use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, info};

use super::{
    config::CouchConfig,
    error::{CouchError, CouchResult},
    models::{CouchRoomDocument, room_doc_id},
};
use crate::dao::{
    models::RoomEntity,
    room_store::RoomStore,
    storage::{StorageError, StorageResult},
};

/// CouchDB-backed [`RoomStore`] talking to the HTTP API with `reqwest`.
#[derive(Clone)]
pub struct CouchRoomStore {
    client: Client,
    config: Arc<CouchConfig>,
}

impl CouchRoomStore {
    /// Build the client and create the rooms database when it is missing.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchError::Client { source })?;

        let store = Self {
            client,
            config: Arc::new(config),
        };
        store.ensure_database().await?;
        info!(database = %store.config.database, "CouchDB room store ready");
        Ok(store)
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.config.base_url, self.config.database)
    }

    fn request(&self, method: Method, path: Option<&str>) -> RequestBuilder {
        let url = match path {
            Some(path) => format!("{}/{path}", self.database_url()),
            None => self.database_url(),
        };
        let builder = self.client.request(method, url);
        match &self.config.credentials {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, target: &str) -> CouchResult<Response> {
        builder.send().await.map_err(|source| CouchError::Transport {
            target: target.to_owned(),
            source,
        })
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let target = &self.config.database;
        let response = self.send(self.request(Method::GET, None), target).await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!(database = %target, "creating CouchDB database");
                let created = self.send(self.request(Method::PUT, None), target).await?;
                // 412 means another instance created it first.
                match created.status() {
                    status if status.is_success() => Ok(()),
                    StatusCode::PRECONDITION_FAILED => Ok(()),
                    status => Err(CouchError::Status {
                        target: target.clone(),
                        status,
                    }),
                }
            }
            status => Err(CouchError::Status {
                target: target.clone(),
                status,
            }),
        }
    }

    async fn ping(&self) -> CouchResult<()> {
        let target = &self.config.database;
        let response = self.send(self.request(Method::HEAD, None), target).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(CouchError::Status {
                target: target.clone(),
                status,
            }),
        }
    }

    async fn fetch(&self, room_id: &str) -> CouchResult<Option<CouchRoomDocument>> {
        let doc_id = room_doc_id(room_id);
        let response = self
            .send(self.request(Method::GET, Some(&doc_id)), &doc_id)
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchRoomDocument>()
                .await
                .map(Some)
                .map_err(|source| CouchError::Decode {
                    target: doc_id,
                    source,
                }),
            status => Err(CouchError::Status {
                target: doc_id,
                status,
            }),
        }
    }

    async fn put(&self, document: &CouchRoomDocument) -> CouchResult<()> {
        let response = self
            .send(
                self.request(Method::PUT, Some(&document.id)).json(document),
                &document.id,
            )
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CouchError::Conflict {
                target: document.id.clone(),
            }),
            status => Err(CouchError::Status {
                target: document.id.clone(),
                status,
            }),
        }
    }

    async fn insert(&self, mut room: RoomEntity) -> StorageResult<RoomEntity> {
        room.version = 1;
        match self.put(&CouchRoomDocument::new(room.clone(), None)).await {
            Ok(()) => Ok(room),
            Err(CouchError::Conflict { .. }) => Err(StorageError::AlreadyExists { id: room.id }),
            Err(err) => Err(err.into()),
        }
    }

    async fn replace(&self, mut room: RoomEntity) -> StorageResult<RoomEntity> {
        let Some(stored) = self.fetch(&room.id).await? else {
            return Err(StorageError::NotFound { id: room.id });
        };

        let expected = room.version;
        if stored.version != expected {
            return Err(StorageError::VersionConflict {
                id: room.id,
                expected,
                actual: stored.version,
            });
        }

        room.version = expected + 1;
        // A write between our GET and PUT bumps `_rev` and CouchDB answers 409.
        match self.put(&CouchRoomDocument::new(room.clone(), stored.rev)).await {
            Ok(()) => Ok(room),
            Err(CouchError::Conflict { .. }) => Err(StorageError::VersionConflict {
                id: room.id,
                expected,
                actual: expected + 1,
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn remove(&self, room_id: &str, version: u64) -> StorageResult<bool> {
        let Some(stored) = self.fetch(room_id).await? else {
            return Ok(false);
        };
        if stored.version != version {
            return Err(StorageError::VersionConflict {
                id: room_id.to_owned(),
                expected: version,
                actual: stored.version,
            });
        }
        let Some(rev) = stored.rev else {
            return Ok(false);
        };

        let response = self
            .send(
                self.request(Method::DELETE, Some(&stored.id))
                    .query(&[("rev", rev)]),
                &stored.id,
            )
            .await?;

        // A write between our GET and DELETE bumps `_rev` and CouchDB answers 409.
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            StatusCode::CONFLICT => Err(StorageError::VersionConflict {
                id: room_id.to_owned(),
                expected: version,
                actual: version + 1,
            }),
            status => Err(CouchError::Status {
                target: stored.id,
                status,
            }
            .into()),
        }
    }
}

impl RoomStore for CouchRoomStore {
    fn find_room(&self, id: String) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store.fetch(&id).await?;
            Ok(document.map(CouchRoomDocument::into_entity))
        })
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
        Box::pin(async move { store.remove(&id, version).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ping().await?) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ensure_database().await?) })
    }
}
