use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dto::room::{PlayerInput, RoomSnapshot};

#[derive(Debug, Deserialize, ToSchema, PartialEq, Eq)]
/// Messages accepted from player WebSocket clients.
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Must be the first frame of a socket.
    JoinRoom {
        /// Room code, created on first join.
        #[serde(rename = "roomId")]
        room_id: String,
        /// Joining player.
        player: PlayerInput,
    },
    /// Lobby ready toggle.
    Ready,
    /// Change the display name.
    Rename {
        /// New display name.
        username: String,
    },
    /// Guess for the current movie.
    SubmitAnswer {
        /// Client-side verdict.
        #[serde(rename = "isCorrect")]
        is_correct: bool,
        /// Movie the guess is for.
        #[serde(rename = "movieId")]
        movie_id: String,
    },
    /// Leave the room.
    Exit,
    /// Any unrecognised `type`.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse one text frame.
    pub fn from_json_str(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages pushed to player WebSocket clients.
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Full room snapshot after every change.
    RoomUpdate {
        /// Current room state.
        room: RoomSnapshot,
    },
    /// A message from this socket was rejected.
    Error {
        /// Human readable reason.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::state::room::tests::waiting_room;

    #[test]
    fn join_message_carries_room_and_player() {
        let message = ClientMessage::from_json_str(
            r#"{"type":"JOIN_ROOM","roomId":"ABC123","player":{"id":"p1","username":"Alice"}}"#,
        )
        .unwrap();

        let ClientMessage::JoinRoom { room_id, player } = message else {
            panic!("expected JOIN_ROOM");
        };
        assert_eq!(room_id, "ABC123");
        assert_eq!(player.username, "Alice");
    }

    #[test]
    fn answer_message_uses_camel_case_fields() {
        let message =
            ClientMessage::from_json_str(r#"{"type":"SUBMIT_ANSWER","isCorrect":false,"movieId":"4"}"#)
                .unwrap();
        assert_eq!(
            message,
            ClientMessage::SubmitAnswer {
                is_correct: false,
                movie_id: "4".into()
            }
        );
    }

    #[test]
    fn unknown_types_do_not_fail_parsing() {
        let message = ClientMessage::from_json_str(r#"{"type":"PING"}"#).unwrap();
        assert_eq!(message, ClientMessage::Unknown);
    }

    #[test]
    fn server_messages_are_tagged() {
        let update = serde_json::to_value(ServerMessage::RoomUpdate {
            room: RoomSnapshot::from(&waiting_room()),
        })
        .unwrap();
        assert_eq!(update["type"], "ROOM_UPDATE");
        assert_eq!(update["room"]["id"], "ABC123");

        let error = serde_json::to_value(ServerMessage::Error {
            message: "nope".into(),
        })
        .unwrap();
        assert_eq!(error, json!({ "type": "ERROR", "message": "nope" }));
    }
}
