use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;
use validator::Validate;

use crate::{
    dto::room::RoomPath,
    error::AppError,
    routes::ApiPath,
    services::sse_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/api/rooms/{id}/events",
    tag = "sse",
    params(RoomPath),
    responses(
        (status = 200, description = "Room snapshot stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Room not found")
    )
)]
/// Stream `room.update` events for one room, starting with its current snapshot.
pub async fn room_stream(
    State(state): State<SharedState>,
    ApiPath(path): ApiPath<RoomPath>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    path.validate()?;
    let (receiver, initial) = sse_service::subscribe_room(&state, &path.id).await?;
    info!(room_id = %path.id, "new room SSE connection");
    Ok(sse_service::to_sse_stream(receiver, initial, path.id))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/api/rooms/{id}/events", get(room_stream))
}
