use axum::extract::ws::Message;
use tracing::warn;

use crate::{
    dto::{
        room::RoomSnapshot,
        sse::{ROOM_DELETED_EVENT, ROOM_UPDATE_EVENT, RoomDeletedEvent, ServerEvent},
        ws::ServerMessage,
    },
    state::{SharedState, room::Room},
};

/// Push the full snapshot to every connected member socket and to the room's SSE subscribers.
pub fn publish_room(state: &SharedState, room: &Room) {
    let snapshot = RoomSnapshot::from(room);

    match serde_json::to_string(&ServerMessage::RoomUpdate {
        room: snapshot.clone(),
    }) {
        Ok(payload) => {
            for player_id in room.players.keys() {
                let Some(connection) = state.connections().get(player_id) else {
                    continue;
                };
                if connection.room_id != room.id {
                    continue;
                }
                if connection
                    .tx
                    .send(Message::Text(payload.clone().into()))
                    .is_err()
                {
                    warn!(room_id = %room.id, player_id = %player_id, "player socket writer closed");
                }
            }
        }
        Err(err) => warn!(room_id = %room.id, error = %err, "failed to serialize room update"),
    }

    match ServerEvent::json(Some(ROOM_UPDATE_EVENT.to_string()), &snapshot) {
        Ok(event) => state.room_hubs().broadcast(&room.id, event),
        Err(err) => warn!(room_id = %room.id, error = %err, "failed to serialize room SSE event"),
    }
}

/// Tell SSE subscribers the room is gone and close its hub.
pub fn publish_room_deleted(state: &SharedState, room_id: &str) {
    let payload = RoomDeletedEvent {
        room_id: room_id.to_string(),
    };
    if let Ok(event) = ServerEvent::json(Some(ROOM_DELETED_EVENT.to_string()), &payload) {
        state.room_hubs().broadcast(room_id, event);
    }
    state.room_hubs().close(room_id);
}

/// Send an `ERROR` message to a single socket.
pub fn send_error(tx: &tokio::sync::mpsc::UnboundedSender<Message>, message: impl Into<String>) {
    let message = ServerMessage::Error {
        message: message.into(),
    };
    match serde_json::to_string(&message) {
        Ok(payload) => {
            let _ = tx.send(Message::Text(payload.into()));
        }
        Err(err) => warn!(error = %err, "failed to serialize error message"),
    }
}
