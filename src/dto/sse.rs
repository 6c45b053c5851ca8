use serde::Serialize;
use utoipa::ToSchema;

/// Event name carrying a full room snapshot.
pub const ROOM_UPDATE_EVENT: &str = "room.update";
/// Event name sent once when the room has been destroyed.
pub const ROOM_DELETED_EVENT: &str = "room.deleted";

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE `event:` name; unnamed events use the default `message`.
    pub event: Option<String>,
    /// Serialized JSON body.
    pub data: String,
}

impl ServerEvent {
    /// Wrap an already serialized payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Payload of the `room.deleted` event.
pub struct RoomDeletedEvent {
    /// Code of the deleted room.
    pub room_id: String,
}
