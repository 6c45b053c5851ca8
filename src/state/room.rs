use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    dao::models::{
        AnswerResultEntity, MovieEntity, PlayerEntity, RoomEntity, RoomStatusEntity,
    },
    state::state_machine::{InvalidTransition, RoomEvent, RoomStatus, next_status},
};

/// Timing and size rules applied to every room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundRules {
    /// Length of one round in seconds.
    pub round_seconds: u32,
    /// Number of movies drawn for a room.
    pub rounds_per_room: usize,
}

impl Default for RoundRules {
    fn default() -> Self {
        Self {
            round_seconds: 10,
            rounds_per_room: 10,
        }
    }
}

/// Movie to guess in one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    /// Catalog identifier.
    pub id: String,
    /// Expected answer.
    pub title: String,
    /// Screenshot URL.
    pub image_url: String,
    /// Release year.
    pub year: i32,
    /// Genre label.
    pub genre: String,
}

/// Identity supplied by a client when joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    /// Client-generated identifier.
    pub id: String,
    /// Trimmed display name.
    pub username: String,
}

/// Player state inside a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Client-generated identifier.
    pub id: String,
    /// Display name.
    pub username: String,
    /// Count of correct entries in `results`.
    pub score: u32,
    /// Lobby ready flag.
    pub is_ready: bool,
    /// Outcome of this round's answer; `None` until the player answers.
    pub last_answer_correct: Option<bool>,
    /// Correctness per movie id, in answer order.
    pub results: IndexMap<String, bool>,
}

impl Player {
    fn new(identity: PlayerIdentity) -> Self {
        Self {
            id: identity.id,
            username: identity.username,
            score: 0,
            is_ready: false,
            last_answer_correct: None,
            results: IndexMap::new(),
        }
    }
}

/// Authoritative state of one multiplayer match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Room code.
    pub id: String,
    /// Always a member while the room has players.
    pub host_id: String,
    /// Lifecycle status.
    pub status: RoomStatus,
    /// Index into `movies` of the round being played.
    pub current_round_index: usize,
    /// Fixed at creation.
    pub movies: Vec<Movie>,
    /// Seconds left in the current round.
    pub timer: u32,
    /// Epoch milliseconds of the current round start.
    pub round_start_time: Option<u64>,
    /// Keyed by player id, in join order.
    pub players: IndexMap<String, Player>,
    /// Version of the stored snapshot this room was read from.
    pub version: u64,
}

/// Failures of player actions that are reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The acting player id is unknown to the room.
    #[error("player `{0}` is not in this room")]
    NotMember(String),
    /// Lobby-only action outside the lobby.
    #[error("room is not waiting for players (status {0:?})")]
    NotWaiting(RoomStatus),
    /// Answer outside a running round.
    #[error("room is not playing (status {0:?})")]
    NotPlaying(RoomStatus),
    /// Status change rejected by the state machine.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// Result of a READY action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// Some members are still not ready.
    Waiting,
    /// Every member is ready; the first round started.
    Started,
}

/// Result of an EXIT action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The player was not in the room.
    NotMember,
    /// The player left; `new_host` is set when the host role moved.
    Left {
        /// New host when the leaving player held the role.
        new_host: Option<String>,
    },
    /// The last player left; the room must be destroyed.
    Emptied,
}

impl Room {
    /// Build a fresh waiting room with `host` as its only player.
    pub fn new(id: String, host: PlayerIdentity, movies: Vec<Movie>, rules: &RoundRules) -> Self {
        let host_id = host.id.clone();
        let mut players = IndexMap::new();
        players.insert(host.id.clone(), Player::new(host));

        Self {
            id,
            host_id,
            status: RoomStatus::Waiting,
            current_round_index: 0,
            movies,
            timer: rules.round_seconds,
            round_start_time: None,
            players,
            version: 0,
        }
    }

    /// Movie of the current round, if any.
    pub fn current_movie(&self) -> Option<&Movie> {
        self.movies.get(self.current_round_index)
    }

    /// Whether `player_id` is in the room.
    pub fn is_member(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    fn member_mut(&mut self, player_id: &str) -> Result<&mut Player, ActionError> {
        self.players
            .get_mut(player_id)
            .ok_or_else(|| ActionError::NotMember(player_id.to_string()))
    }

    /// Add a player if not already present. Returns whether the room changed.
    pub fn join(&mut self, identity: PlayerIdentity) -> bool {
        if self.players.contains_key(&identity.id) {
            return false;
        }
        self.players
            .insert(identity.id.clone(), Player::new(identity));
        true
    }

    /// Mark a player ready and start the first round once everybody is.
    pub fn ready(
        &mut self,
        player_id: &str,
        now_ms: u64,
        rules: &RoundRules,
    ) -> Result<ReadyOutcome, ActionError> {
        if !self.is_member(player_id) {
            return Err(ActionError::NotMember(player_id.to_string()));
        }
        if self.status != RoomStatus::Waiting {
            return Err(ActionError::NotWaiting(self.status));
        }

        self.member_mut(player_id)?.is_ready = true;

        let everyone_ready = self.players.values().all(|player| player.is_ready);
        if !everyone_ready || self.players.is_empty() {
            return Ok(ReadyOutcome::Waiting);
        }

        self.status = next_status(self.status, RoomEvent::AllPlayersReady)?;
        self.current_round_index = 0;
        self.timer = rules.round_seconds;
        self.round_start_time = Some(now_ms);
        Ok(ReadyOutcome::Started)
    }

    /// Rename a player. Blank names are ignored. Returns whether the room changed.
    pub fn rename(&mut self, player_id: &str, username: &str) -> Result<bool, ActionError> {
        let player = self.member_mut(player_id)?;
        let username = username.trim();
        if username.is_empty() || player.username == username {
            return Ok(false);
        }
        player.username = username.to_string();
        Ok(true)
    }

    /// Record a player's answer for the current movie.
    ///
    /// Only the first answer per movie counts; repeats and answers for a movie other than the
    /// current one are ignored. Returns whether the room changed.
    pub fn submit_answer(
        &mut self,
        player_id: &str,
        movie_id: &str,
        is_correct: bool,
    ) -> Result<bool, ActionError> {
        if !self.is_member(player_id) {
            return Err(ActionError::NotMember(player_id.to_string()));
        }
        if self.status != RoomStatus::Playing {
            return Err(ActionError::NotPlaying(self.status));
        }
        if self.current_movie().map(|movie| movie.id.as_str()) != Some(movie_id) {
            return Ok(false);
        }

        let player = self.member_mut(player_id)?;
        if player.results.contains_key(movie_id) {
            return Ok(false);
        }

        player.results.insert(movie_id.to_string(), is_correct);
        player.last_answer_correct = Some(is_correct);
        if is_correct {
            player.score += 1;
        }
        Ok(true)
    }

    /// Remove a player, handing the host role to the first remaining player when needed.
    pub fn exit(&mut self, player_id: &str) -> ExitOutcome {
        if self.players.shift_remove(player_id).is_none() {
            return ExitOutcome::NotMember;
        }

        let Some(first) = self.players.keys().next().cloned() else {
            return ExitOutcome::Emptied;
        };

        if self.host_id == player_id {
            self.host_id = first.clone();
            ExitOutcome::Left {
                new_host: Some(first),
            }
        } else {
            ExitOutcome::Left { new_host: None }
        }
    }

    /// Forget every player's answer state for the round that just ended.
    pub(crate) fn clear_round_answers(&mut self) {
        self.players
            .values_mut()
            .for_each(|player| player.last_answer_correct = None);
    }
}

impl From<MovieEntity> for Movie {
    fn from(value: MovieEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            image_url: value.image_url,
            year: value.year,
            genre: value.genre,
        }
    }
}

impl From<Movie> for MovieEntity {
    fn from(value: Movie) -> Self {
        Self {
            id: value.id,
            title: value.title,
            image_url: value.image_url,
            year: value.year,
            genre: value.genre,
        }
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        let mut results = IndexMap::new();
        for result in value.results {
            results.entry(result.movie_id).or_insert(result.is_correct);
        }

        Self {
            id: value.id,
            username: value.username,
            score: value.score,
            is_ready: value.is_ready,
            last_answer_correct: value.last_answer_correct,
            results,
        }
    }
}

impl From<Player> for PlayerEntity {
    fn from(value: Player) -> Self {
        Self {
            id: value.id,
            username: value.username,
            score: value.score,
            is_ready: value.is_ready,
            last_answer_correct: value.last_answer_correct,
            results: value
                .results
                .into_iter()
                .map(|(movie_id, is_correct)| AnswerResultEntity {
                    movie_id,
                    is_correct,
                })
                .collect(),
        }
    }
}

impl From<RoomStatusEntity> for RoomStatus {
    fn from(value: RoomStatusEntity) -> Self {
        match value {
            RoomStatusEntity::Waiting => RoomStatus::Waiting,
            RoomStatusEntity::Starting => RoomStatus::Starting,
            RoomStatusEntity::Playing => RoomStatus::Playing,
            RoomStatusEntity::Finished => RoomStatus::Finished,
        }
    }
}

impl From<RoomStatus> for RoomStatusEntity {
    fn from(value: RoomStatus) -> Self {
        match value {
            RoomStatus::Waiting => RoomStatusEntity::Waiting,
            RoomStatus::Starting => RoomStatusEntity::Starting,
            RoomStatus::Playing => RoomStatusEntity::Playing,
            RoomStatus::Finished => RoomStatusEntity::Finished,
        }
    }
}

impl From<RoomEntity> for Room {
    fn from(value: RoomEntity) -> Self {
        Self {
            id: value.id,
            host_id: value.host_id,
            status: value.status.into(),
            current_round_index: value.current_round_index as usize,
            movies: value.movies.into_iter().map(Into::into).collect(),
            timer: value.timer,
            round_start_time: value.round_start_time,
            players: value
                .players
                .into_iter()
                .map(|player| (player.id.clone(), player.into()))
                .collect(),
            version: value.version,
        }
    }
}

impl From<Room> for RoomEntity {
    fn from(value: Room) -> Self {
        Self {
            id: value.id,
            host_id: value.host_id,
            status: value.status.into(),
            current_round_index: u32::try_from(value.current_round_index).unwrap_or(u32::MAX),
            movies: value.movies.into_iter().map(Into::into).collect(),
            timer: value.timer,
            round_start_time: value.round_start_time,
            players: value.players.into_values().map(Into::into).collect(),
            version: value.version,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn movies(count: usize) -> Vec<Movie> {
        (0..count)
            .map(|i| Movie {
                id: format!("m{i}"),
                title: format!("Movie {i}"),
                image_url: format!("https://img.example/{i}.jpg"),
                year: 2000 + i as i32,
                genre: "Drama".into(),
            })
            .collect()
    }

    pub(crate) fn identity(id: &str, username: &str) -> PlayerIdentity {
        PlayerIdentity {
            id: id.into(),
            username: username.into(),
        }
    }

    pub(crate) fn waiting_room() -> Room {
        Room::new(
            "ABC123".into(),
            identity("p1", "Alice"),
            movies(10),
            &RoundRules::default(),
        )
    }

    fn assert_scores_match_results(room: &Room) {
        for player in room.players.values() {
            let correct = player.results.values().filter(|ok| **ok).count() as u32;
            assert_eq!(player.score, correct, "score drifted for {}", player.id);
        }
    }

    #[test]
    fn join_is_idempotent() {
        let mut room = waiting_room();
        assert!(room.join(identity("p2", "Bob")));
        assert!(!room.join(identity("p2", "Bobby")));
        assert_eq!(room.players.len(), 2);
        assert_eq!(room.players["p2"].username, "Bob");
    }

    #[test]
    fn room_starts_only_when_everyone_is_ready() {
        let rules = RoundRules::default();
        let mut room = waiting_room();
        room.join(identity("p2", "Bob"));

        assert_eq!(
            room.ready("p1", 1_000, &rules).unwrap(),
            ReadyOutcome::Waiting
        );
        assert_eq!(room.status, RoomStatus::Waiting);

        assert_eq!(
            room.ready("p2", 2_000, &rules).unwrap(),
            ReadyOutcome::Started
        );
        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.round_start_time, Some(2_000));
        assert_eq!(room.timer, 10);
        assert_eq!(room.current_round_index, 0);
    }

    #[test]
    fn single_player_room_starts_immediately() {
        let mut room = waiting_room();
        let outcome = room.ready("p1", 0, &RoundRules::default()).unwrap();
        assert_eq!(outcome, ReadyOutcome::Started);
    }

    #[test]
    fn ready_requires_membership_and_waiting_status() {
        let rules = RoundRules::default();
        let mut room = waiting_room();
        assert_eq!(
            room.ready("ghost", 0, &rules),
            Err(ActionError::NotMember("ghost".into()))
        );

        room.ready("p1", 0, &rules).unwrap();
        assert_eq!(
            room.ready("p1", 5, &rules),
            Err(ActionError::NotWaiting(RoomStatus::Playing))
        );
        assert_eq!(room.round_start_time, Some(0));
    }

    #[test]
    fn rename_trims_and_ignores_blank_names() {
        let mut room = waiting_room();
        assert!(room.rename("p1", "  Alicia ").unwrap());
        assert_eq!(room.players["p1"].username, "Alicia");

        assert!(!room.rename("p1", "   ").unwrap());
        assert_eq!(room.players["p1"].username, "Alicia");

        assert!(room.rename("ghost", "Eve").is_err());
    }

    #[test]
    fn first_answer_per_movie_wins() {
        let mut room = waiting_room();
        room.ready("p1", 0, &RoundRules::default()).unwrap();

        assert!(room.submit_answer("p1", "m0", true).unwrap());
        assert!(!room.submit_answer("p1", "m0", true).unwrap());
        assert!(!room.submit_answer("p1", "m0", false).unwrap());

        let player = &room.players["p1"];
        assert_eq!(player.score, 1);
        assert_eq!(player.results.len(), 1);
        assert_eq!(player.last_answer_correct, Some(true));
        assert_scores_match_results(&room);
    }

    #[test]
    fn answers_for_other_movies_are_ignored() {
        let mut room = waiting_room();
        room.ready("p1", 0, &RoundRules::default()).unwrap();

        assert!(!room.submit_answer("p1", "m3", true).unwrap());
        assert!(room.players["p1"].results.is_empty());
        assert_scores_match_results(&room);
    }

    #[test]
    fn answers_are_rejected_outside_play() {
        let mut room = waiting_room();
        assert_eq!(
            room.submit_answer("p1", "m0", true),
            Err(ActionError::NotPlaying(RoomStatus::Waiting))
        );
        assert_eq!(
            room.submit_answer("ghost", "m0", true),
            Err(ActionError::NotMember("ghost".into()))
        );
    }

    #[test]
    fn host_exit_hands_over_to_first_remaining_player() {
        let mut room = waiting_room();
        room.join(identity("p2", "Bob"));
        room.join(identity("p3", "Carol"));

        assert_eq!(
            room.exit("p1"),
            ExitOutcome::Left {
                new_host: Some("p2".into())
            }
        );
        assert_eq!(room.host_id, "p2");
        assert_eq!(room.exit("p3"), ExitOutcome::Left { new_host: None });
        assert_eq!(room.exit("ghost"), ExitOutcome::NotMember);
        assert_eq!(room.exit("p2"), ExitOutcome::Emptied);
        assert!(room.players.is_empty());
    }

    #[test]
    fn entity_conversion_preserves_join_order_and_results() {
        let mut room = waiting_room();
        room.join(identity("p2", "Bob"));
        room.ready("p1", 0, &RoundRules::default()).unwrap();
        room.ready("p2", 0, &RoundRules::default()).unwrap();
        room.submit_answer("p2", "m0", false).unwrap();
        room.version = 7;

        let entity: RoomEntity = room.clone().into();
        assert_eq!(entity.players[0].id, "p1");
        assert_eq!(entity.players[1].results.len(), 1);

        let back: Room = entity.into();
        assert_eq!(back, room);
    }
}
