use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::validation::{validate_not_blank, validate_room_code, validate_username_len},
    state::{
        room::{Movie, Player, PlayerIdentity, Room},
        state_machine::RoomStatus,
    },
};

/// Room status exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoomStatus {
    /// Lobby.
    Waiting,
    /// Countdown before the first round.
    Starting,
    /// A round is running.
    Playing,
    /// Final scores are shown.
    Finished,
}

impl From<RoomStatus> for VisibleRoomStatus {
    fn from(value: RoomStatus) -> Self {
        match value {
            RoomStatus::Waiting => VisibleRoomStatus::Waiting,
            RoomStatus::Starting => VisibleRoomStatus::Starting,
            RoomStatus::Playing => VisibleRoomStatus::Playing,
            RoomStatus::Finished => VisibleRoomStatus::Finished,
        }
    }
}

/// Movie as shown to players.
#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MovieSnapshot {
    /// Catalog identifier.
    pub id: String,
    /// Title to guess.
    pub title: String,
    /// Screenshot URL.
    pub image_url: String,
    /// Release year.
    pub year: i32,
    /// Genre label.
    pub genre: String,
}

impl From<&Movie> for MovieSnapshot {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id.clone(),
            title: movie.title.clone(),
            image_url: movie.image_url.clone(),
            year: movie.year,
            genre: movie.genre.clone(),
        }
    }
}

/// One answered movie.
#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResultSnapshot {
    /// Answered movie.
    pub movie_id: String,
    /// Whether the answer was right.
    pub is_correct: bool,
}

/// Player as shown to everyone in the room.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    /// Player identifier.
    pub id: String,
    /// Display name.
    pub username: String,
    /// Correct answers so far.
    pub score: u32,
    /// Ready flag from the lobby.
    pub is_ready: bool,
    /// Absent until the player answers the current round.
    pub last_answer_correct: Option<bool>,
    /// Answers in the order they were given.
    pub results: Vec<AnswerResultSnapshot>,
}

impl From<&Player> for PlayerSnapshot {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            username: player.username.clone(),
            score: player.score,
            is_ready: player.is_ready,
            last_answer_correct: player.last_answer_correct,
            results: player
                .results
                .iter()
                .map(|(movie_id, is_correct)| AnswerResultSnapshot {
                    movie_id: movie_id.clone(),
                    is_correct: *is_correct,
                })
                .collect(),
        }
    }
}

/// Full room state sent on every update.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// Room code.
    pub id: String,
    /// Current host.
    pub host_id: String,
    /// Lifecycle status.
    pub status: VisibleRoomStatus,
    /// Zero-based index into `movies`.
    pub current_round_index: usize,
    /// Same value as `currentRoundIndex`, under the name browser clients read.
    pub current_movie_index: usize,
    /// Movies of this room in play order.
    pub movies: Vec<MovieSnapshot>,
    /// Seconds left in the current round.
    pub timer: u32,
    /// Epoch milliseconds; absent before the first round.
    pub round_start_time: Option<u64>,
    /// Players in join order.
    pub players: Vec<PlayerSnapshot>,
    /// Snapshot version, increasing on every write.
    pub version: u64,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            host_id: room.host_id.clone(),
            status: room.status.into(),
            current_round_index: room.current_round_index,
            current_movie_index: room.current_round_index,
            movies: room.movies.iter().map(MovieSnapshot::from).collect(),
            timer: room.timer,
            round_start_time: room.round_start_time,
            players: room.players.values().map(PlayerSnapshot::from).collect(),
            version: room.version,
        }
    }
}

/// Path parameters of every `/api/rooms/{id}` route.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Path)]
pub struct RoomPath {
    /// Shareable room code.
    #[validate(custom(function = "validate_room_code"))]
    pub id: String,
}

/// Player identity supplied by the client.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate, PartialEq, Eq)]
pub struct PlayerInput {
    /// Client-generated identifier, stable across reconnects.
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    /// Display name, trimmed before use.
    #[validate(length(min = 1, max = 64), custom(function = "validate_not_blank"))]
    pub username: String,
}

impl From<PlayerInput> for PlayerIdentity {
    fn from(value: PlayerInput) -> Self {
        Self {
            id: value.id,
            username: value.username.trim().to_string(),
        }
    }
}

/// Body of `POST /api/rooms/{id}/join`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    /// Joining player.
    #[validate(nested)]
    pub player: PlayerInput,
}

/// Body of `POST /api/rooms`; the server picks the code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRoomRequest {
    /// Host of the new room.
    #[validate(nested)]
    pub player: PlayerInput,
}

/// Action payload, discriminated by `type`.
#[derive(Debug, Clone, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomAction {
    /// Mark the player ready in the lobby.
    Ready,
    /// Change the display name.
    Rename {
        /// New display name.
        username: String,
    },
    /// Report the guess for the current movie.
    SubmitAnswer {
        /// Whether the client judged the guess correct.
        #[serde(rename = "isCorrect")]
        is_correct: bool,
        /// Movie the guess is for; stale ids are ignored.
        #[serde(rename = "movieId")]
        movie_id: String,
    },
    /// Leave the room.
    Exit,
}

/// Body of `POST /api/rooms/{id}/action`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RoomActionRequest {
    /// Acting player.
    #[serde(rename = "playerId")]
    pub player_id: String,
    /// What the player does.
    #[serde(flatten)]
    pub action: RoomAction,
}

impl Validate for RoomActionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.player_id.is_empty() || self.player_id.len() > 64 {
            let mut err = ValidationError::new("length");
            err.message = Some("playerId must be between 1 and 64 characters".into());
            errors.add("playerId", err);
        }

        match &self.action {
            RoomAction::Rename { username } => {
                if let Err(err) = validate_username_len(username) {
                    errors.add("username", err);
                }
            }
            RoomAction::SubmitAnswer { movie_id, .. } if movie_id.is_empty() => {
                errors.add("movieId", ValidationError::new("required"));
            }
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Returned when the last player left and the room is gone.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    /// Always `deleted`.
    pub status: String,
}

impl DeletedResponse {
    /// Build the `deleted` marker.
    pub fn new() -> Self {
        Self {
            status: "deleted".into(),
        }
    }
}

impl Default for DeletedResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response of `POST /api/rooms/{id}/action`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ActionResponse {
    /// Room after the action.
    Room(RoomSnapshot),
    /// The room was deleted.
    Deleted(DeletedResponse),
}
