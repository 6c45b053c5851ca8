use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::dao::models::RoomEntity;

pub const ROOM_PREFIX: &str = "room::";

/// CouchDB document wrapping a room snapshot.
///
/// `_rev` is CouchDB's own revision; `version` is the application-level sequence number
/// checked before every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRoomDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub version: u64,
    pub state: RoomEntity,
    pub updated_at: SystemTime,
}

impl CouchRoomDocument {
    pub fn new(room: RoomEntity, rev: Option<String>) -> Self {
        Self {
            id: room_doc_id(&room.id),
            rev,
            version: room.version,
            state: room,
            updated_at: SystemTime::now(),
        }
    }

    pub fn into_entity(self) -> RoomEntity {
        let mut room = self.state;
        room.version = self.version;
        room
    }
}

pub fn room_doc_id(id: &str) -> String {
    format!("{ROOM_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::RoomStatusEntity;

    #[test]
    fn document_keeps_version_outside_the_snapshot() {
        let room = RoomEntity {
            id: "ABC123".into(),
            host_id: "p1".into(),
            status: RoomStatusEntity::Waiting,
            current_round_index: 0,
            movies: Vec::new(),
            timer: 10,
            round_start_time: None,
            players: Vec::new(),
            version: 4,
        };

        let doc = CouchRoomDocument::new(room, Some("3-abc".into()));
        assert_eq!(doc.id, "room::ABC123");
        assert_eq!(doc.version, 4);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["_rev"], "3-abc");
        assert_eq!(json["state"]["host_id"], "p1");

        let back: CouchRoomDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back.into_entity().version, 4);
    }
}
