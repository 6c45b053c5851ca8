//! Storage-facing room snapshots, shared by every room store.

use serde::{Deserialize, Serialize};

/// Catalog movie copied into a room when it is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieEntity {
    /// Catalog identifier of the movie.
    pub id: String,
    /// Title players have to guess.
    pub title: String,
    /// Screenshot shown during the round.
    pub image_url: String,
    /// Release year.
    pub year: i32,
    /// Genre label.
    pub genre: String,
}

/// Outcome of one answer submitted by a player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerResultEntity {
    /// Movie the answer was given for.
    pub movie_id: String,
    /// Whether the guess was right.
    pub is_correct: bool,
}

/// Player embedded in a persisted room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Opaque identifier supplied by the client.
    pub id: String,
    /// Display name.
    pub username: String,
    /// Number of correct answers.
    pub score: u32,
    /// Set once the player pressed ready in the lobby.
    pub is_ready: bool,
    /// Outcome of the answer given in the current round, if any.
    #[serde(default)]
    pub last_answer_correct: Option<bool>,
    /// One entry per answered movie, in answer order.
    #[serde(default)]
    pub results: Vec<AnswerResultEntity>,
}

/// Persisted status of a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatusEntity {
    /// Lobby, players joining.
    Waiting,
    /// Everyone is ready; first round pending.
    Starting,
    /// Rounds in progress.
    Playing,
    /// Every movie was played.
    Finished,
}

/// Full room snapshot persisted by the storage layer.
///
/// Stores always read and write the whole snapshot; `version` is owned by the store and is
/// bumped on every successful write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Shareable room code, primary key.
    pub id: String,
    /// Player currently owning the room.
    pub host_id: String,
    /// Lifecycle status.
    pub status: RoomStatusEntity,
    /// Index of the movie being guessed.
    pub current_round_index: u32,
    /// Movies drawn for this room, in play order.
    pub movies: Vec<MovieEntity>,
    /// Seconds left in the current round.
    pub timer: u32,
    /// Epoch milliseconds at which the current round started.
    #[serde(default)]
    pub round_start_time: Option<u64>,
    /// Players in join order.
    pub players: Vec<PlayerEntity>,
    /// Sequence number of this snapshot (0 until first stored).
    #[serde(default)]
    pub version: u64,
}
