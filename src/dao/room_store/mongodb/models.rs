use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::RoomEntity;

/// One document per room: the full snapshot plus the version used for compare-and-swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoomDocument {
    #[serde(rename = "_id")]
    id: String,
    version: i64,
    state: RoomEntity,
    updated_at: DateTime,
}

impl MongoRoomDocument {
    pub fn version(&self) -> u64 {
        u64::try_from(self.version).unwrap_or_default()
    }
}

impl From<RoomEntity> for MongoRoomDocument {
    fn from(value: RoomEntity) -> Self {
        Self {
            id: value.id.clone(),
            version: version_as_i64(value.version),
            state: value,
            updated_at: DateTime::now(),
        }
    }
}

impl From<MongoRoomDocument> for RoomEntity {
    fn from(value: MongoRoomDocument) -> Self {
        let version = value.version();
        let mut room = value.state;
        room.id = value.id;
        room.version = version;
        room
    }
}

pub fn version_as_i64(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}

pub fn doc_id_at_version(id: &str, version: u64) -> Document {
    doc! {"_id": id, "version": version_as_i64(version)}
}
