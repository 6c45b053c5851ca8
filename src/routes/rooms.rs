use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use tracing::info;
use validator::Validate;

use crate::{
    dto::room::{
        ActionResponse, CreateRoomRequest, DeletedResponse, JoinRoomRequest, RoomAction,
        RoomActionRequest, RoomPath, RoomSnapshot,
    },
    error::AppError,
    routes::{ApiJson, ApiPath},
    services::room_service::{self, ActionOutcome, PlayerAction},
    state::SharedState,
};

/// Routes of the polling room API.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/{id}", get(get_room))
        .route("/api/rooms/{id}/join", post(join_room))
        .route("/api/rooms/{id}/action", post(room_action))
}

/// Open a room under a server-generated code.
#[utoipa::path(
    post,
    path = "/api/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomSnapshot),
        (status = 400, description = "Invalid player"),
        (status = 409, description = "Catalog too small")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<CreateRoomRequest>,
) -> Result<Json<RoomSnapshot>, AppError> {
    payload.validate()?;
    let room = room_service::create_room(&state, payload.player.into()).await?;
    Ok(Json(RoomSnapshot::from(&room)))
}

/// Current snapshot of a room, with its countdown brought up to date.
#[utoipa::path(
    get,
    path = "/api/rooms/{id}",
    tag = "rooms",
    params(RoomPath),
    responses(
        (status = 200, description = "Room snapshot", body = RoomSnapshot),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    ApiPath(path): ApiPath<RoomPath>,
) -> Result<Json<RoomSnapshot>, AppError> {
    path.validate()?;
    let room = room_service::get_room(&state, &path.id).await?;
    Ok(Json(RoomSnapshot::from(&room)))
}

/// Join a room, creating it with the caller as host when the code is new.
#[utoipa::path(
    post,
    path = "/api/rooms/{id}/join",
    tag = "rooms",
    params(RoomPath),
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined room", body = RoomSnapshot),
        (status = 409, description = "Catalog too small")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    ApiPath(path): ApiPath<RoomPath>,
    ApiJson(payload): ApiJson<JoinRoomRequest>,
) -> Result<Json<RoomSnapshot>, AppError> {
    path.validate()?;
    payload.validate()?;
    let room = room_service::join_room(&state, &path.id, payload.player.into()).await?;
    Ok(Json(RoomSnapshot::from(&room)))
}

/// Apply a player action (`READY`, `RENAME`, `SUBMIT_ANSWER`, `EXIT`).
#[utoipa::path(
    post,
    path = "/api/rooms/{id}/action",
    tag = "rooms",
    params(RoomPath),
    request_body = RoomActionRequest,
    responses(
        (status = 200, description = "Updated room, or `{status: \"deleted\"}`", body = ActionResponse),
        (status = 403, description = "Player is not in the room"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Action not allowed in the current status")
    )
)]
pub async fn room_action(
    State(state): State<SharedState>,
    ApiPath(path): ApiPath<RoomPath>,
    ApiJson(payload): ApiJson<RoomActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    path.validate()?;
    payload.validate()?;

    let action = match payload.action {
        RoomAction::Ready => PlayerAction::Ready,
        RoomAction::Rename { username } => PlayerAction::Rename { username },
        RoomAction::SubmitAnswer {
            is_correct,
            movie_id,
        } => PlayerAction::SubmitAnswer {
            movie_id,
            is_correct,
        },
        RoomAction::Exit => PlayerAction::Exit,
    };

    let outcome = room_service::apply_action(&state, &path.id, &payload.player_id, action).await?;
    Ok(Json(match outcome {
        ActionOutcome::Updated(room) => ActionResponse::Room(RoomSnapshot::from(&room)),
        ActionOutcome::Deleted { room_id } => {
            info!(room_id = %room_id, "last player left over HTTP");
            ActionResponse::Deleted(DeletedResponse::new())
        }
    }))
}
