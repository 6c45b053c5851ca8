//! Room lifecycle: every read and player action goes through a version-checked
//! read-modify-write against the installed [`RoomStore`](crate::dao::room_store::RoomStore).

use futures::future::BoxFuture;
use rand::seq::IndexedRandom;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    dao::storage::{StorageError, StorageResult},
    error::ServiceError,
    services::{room_events, ticker_service},
    state::{
        SharedState,
        progression::{self, ProgressionMode},
        room::{ExitOutcome, PlayerIdentity, ReadyOutcome, Room},
        state_machine::RoomStatus,
    },
};

const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Player action applied to an existing room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerAction {
    /// Lobby ready toggle.
    Ready,
    /// Change the display name.
    Rename {
        /// New display name.
        username: String,
    },
    /// Guess for the current movie.
    SubmitAnswer {
        /// Movie the guess is for.
        movie_id: String,
        /// Client-side verdict.
        is_correct: bool,
    },
    /// Leave the room.
    Exit,
}

/// Result of [`apply_action`].
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// Room after the action.
    Updated(Room),
    /// The last player left and the room no longer exists.
    Deleted {
        /// Code of the deleted room.
        room_id: String,
    },
}

/// Whether a ticker should keep running after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The room is still playing.
    Continue,
    /// Finished, deleted or unreadable; the ticker exits.
    Stop,
}

/// What a mutation wants done with the room it was handed.
enum Commit {
    Save,
    Skip,
    Delete,
}

enum Committed {
    Saved(Room),
    Unchanged(Room),
    Deleted(String),
}

/// Read a room, bringing its countdown up to date first.
///
/// A playing room read without a live ticker (for instance after a restart on a durable store)
/// gets its ticker back.
pub async fn get_room(state: &SharedState, room_id: &str) -> Result<Room, ServiceError> {
    match mutate_room(state, room_id, |_, _| Ok(Commit::Skip)).await? {
        Committed::Saved(room) | Committed::Unchanged(room) => {
            if room.status == RoomStatus::Playing {
                ticker_service::ensure_ticker(state, &room.id);
            }
            Ok(room)
        }
        Committed::Deleted(id) => Err(ServiceError::NotFound(format!("room `{id}`"))),
    }
}

/// Add a player to a room, creating the room with the player as host when it does not exist.
pub async fn join_room(
    state: &SharedState,
    room_id: &str,
    identity: PlayerIdentity,
) -> Result<Room, ServiceError> {
    for attempt in 1..=state.config().max_save_attempts() {
        let joined = mutate_room(state, room_id, |room, _| {
            Ok(if room.join(identity.clone()) {
                Commit::Save
            } else {
                Commit::Skip
            })
        })
        .await;

        match joined {
            Ok(Committed::Saved(room) | Committed::Unchanged(room)) => {
                info!(room_id, player_id = %identity.id, "player joined room");
                return Ok(room);
            }
            Ok(Committed::Deleted(_)) | Err(ServiceError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }

        match insert_new_room(state, room_id, identity.clone()).await? {
            Some(room) => return Ok(room),
            None => debug!(room_id, attempt, "room created concurrently; joining instead"),
        }
    }

    Err(ServiceError::Conflict(format!(
        "room `{room_id}` could not be joined after repeated concurrent updates"
    )))
}

/// Open a room under a freshly generated code with `host` as its first player.
pub async fn create_room(
    state: &SharedState,
    host: PlayerIdentity,
) -> Result<Room, ServiceError> {
    for _ in 0..state.config().max_save_attempts() {
        let code = generate_room_code();
        if let Some(room) = insert_new_room(state, &code, host.clone()).await? {
            return Ok(room);
        }
        debug!(room_id = %code, "generated room code already taken");
    }

    Err(ServiceError::Conflict(
        "could not allocate an unused room code".into(),
    ))
}

/// Apply a player action and publish the result.
pub async fn apply_action(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
    action: PlayerAction,
) -> Result<ActionOutcome, ServiceError> {
    let rules = state.rules();
    let committed = mutate_room(state, room_id, |room, now| match &action {
        PlayerAction::Ready => {
            if room.ready(player_id, now, &rules)? == ReadyOutcome::Started {
                info!(room_id = %room.id, "all players ready; room started");
            }
            Ok(Commit::Save)
        }
        PlayerAction::Rename { username } => Ok(save_if(room.rename(player_id, username)?)),
        PlayerAction::SubmitAnswer {
            movie_id,
            is_correct,
        } => Ok(save_if(room.submit_answer(player_id, movie_id, *is_correct)?)),
        PlayerAction::Exit => Ok(match room.exit(player_id) {
            ExitOutcome::NotMember => Commit::Skip,
            ExitOutcome::Left { new_host } => {
                if let Some(host) = new_host {
                    info!(room_id = %room.id, host_id = %host, "host left; role reassigned");
                }
                Commit::Save
            }
            ExitOutcome::Emptied => Commit::Delete,
        }),
    })
    .await?;

    Ok(match committed {
        Committed::Saved(room) | Committed::Unchanged(room) => ActionOutcome::Updated(room),
        Committed::Deleted(room_id) => ActionOutcome::Deleted { room_id },
    })
}

/// One ticker step for `room_id`.
pub async fn advance_room(state: &SharedState, room_id: &str) -> Result<TickOutcome, ServiceError> {
    let mode = state.config().progression();
    let rules = state.rules();
    let committed = mutate_room(state, room_id, |room, now| {
        let progress = match mode {
            ProgressionMode::Ticking => progression::step(room, mode, now, &rules)?,
            ProgressionMode::Derived => progression::Progress::Unchanged,
        };
        Ok(save_if(progress.changed()))
    })
    .await;

    match committed {
        Ok(Committed::Saved(room) | Committed::Unchanged(room)) => {
            Ok(if room.status == RoomStatus::Playing {
                TickOutcome::Continue
            } else {
                TickOutcome::Stop
            })
        }
        Ok(Committed::Deleted(_)) | Err(ServiceError::NotFound(_)) => Ok(TickOutcome::Stop),
        Err(err) => Err(err),
    }
}

fn save_if(changed: bool) -> Commit {
    if changed { Commit::Save } else { Commit::Skip }
}

/// Read-modify-write `room_id`, retrying on stale snapshots.
///
/// The room is caught up with the clock before `apply` runs, so a pure read still stores a
/// timer refresh or round advance.
async fn mutate_room<F>(
    state: &SharedState,
    room_id: &str,
    mut apply: F,
) -> Result<Committed, ServiceError>
where
    F: FnMut(&mut Room, u64) -> Result<Commit, ServiceError>,
{
    let mode = state.config().progression();
    let rules = state.rules();
    let max_attempts = state.config().max_save_attempts();

    for attempt in 1..=max_attempts {
        let store = state.require_room_store().await?;
        let Some(entity) = bounded(state, store.find_room(room_id.to_string())).await?? else {
            return Err(ServiceError::NotFound(format!("room `{room_id}`")));
        };

        let mut room = Room::from(entity);
        let now = state.now_ms();
        let caught_up = progression::catch_up(&mut room, mode, now, &rules)?.changed();

        let commit = match apply(&mut room, now)? {
            Commit::Skip if !caught_up => Commit::Skip,
            Commit::Skip => Commit::Save,
            other => other,
        };

        let committed = match commit {
            Commit::Skip => return Ok(Committed::Unchanged(room)),
            Commit::Delete => {
                match bounded(state, store.delete_room(room_id.to_string(), room.version)).await? {
                    Ok(_) => Committed::Deleted(room_id.to_string()),
                    Err(err) if err.is_retryable() => {
                        debug!(room_id, attempt, error = %err, "room changed before delete; retrying");
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Commit::Save => match bounded(state, store.save_room(room.into())).await? {
                Ok(saved) => Committed::Saved(Room::from(saved)),
                Err(err) if err.is_retryable() => {
                    debug!(room_id, attempt, error = %err, "stale room snapshot; retrying");
                    continue;
                }
                Err(err) => return Err(err.into()),
            },
        };

        after_commit(state, &committed);
        return Ok(committed);
    }

    warn!(room_id, max_attempts, "giving up on room update after repeated conflicts");
    Err(ServiceError::Conflict(format!(
        "room `{room_id}` was modified concurrently too many times"
    )))
}

/// Create a brand new room. Returns `None` when the code is already taken.
async fn insert_new_room(
    state: &SharedState,
    room_id: &str,
    host: PlayerIdentity,
) -> Result<Option<Room>, ServiceError> {
    let store = state.require_room_store().await?;
    let rules = state.rules();
    let movies = state
        .catalog()
        .sample_random_movies(rules.rounds_per_room)
        .await?;

    let host_id = host.id.clone();
    let room = Room::new(
        room_id.to_string(),
        host,
        movies.into_iter().map(Into::into).collect(),
        &rules,
    );

    match bounded(state, store.create_room(room.into())).await? {
        Ok(created) => {
            let room = Room::from(created);
            info!(room_id, host_id = %host_id, "room created");
            after_commit(state, &Committed::Saved(room.clone()));
            Ok(Some(room))
        }
        Err(StorageError::AlreadyExists { .. }) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn after_commit(state: &SharedState, committed: &Committed) {
    match committed {
        Committed::Saved(room) => {
            room_events::publish_room(state, room);
            if room.status == RoomStatus::Playing {
                ticker_service::ensure_ticker(state, &room.id);
            }
        }
        Committed::Deleted(room_id) => {
            if state.tickers().cancel(room_id) {
                debug!(room_id = %room_id, "room ticker cancelled");
            }
            room_events::publish_room_deleted(state, room_id);
            info!(room_id = %room_id, "room deleted");
        }
        Committed::Unchanged(_) => {}
    }
}

/// Run a store call under the configured timeout.
async fn bounded<T>(
    state: &SharedState,
    call: BoxFuture<'static, StorageResult<T>>,
) -> Result<StorageResult<T>, ServiceError> {
    timeout(state.config().store_timeout(), call)
        .await
        .map_err(|_| ServiceError::Timeout)
}

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .filter_map(|_| ROOM_CODE_ALPHABET.choose(&mut rng).map(|byte| char::from(*byte)))
        .collect()
}
