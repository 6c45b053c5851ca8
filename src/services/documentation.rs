use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for CineGuess Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::create_room,
        crate::routes::rooms::get_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::room_action,
        crate::routes::sse::room_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::RoomSnapshot,
            crate::dto::room::PlayerSnapshot,
            crate::dto::room::MovieSnapshot,
            crate::dto::room::VisibleRoomStatus,
            crate::dto::room::PlayerInput,
            crate::dto::room::JoinRoomRequest,
            crate::dto::room::CreateRoomRequest,
            crate::dto::room::RoomAction,
            crate::dto::room::RoomActionRequest,
            crate::dto::room::ActionResponse,
            crate::dto::room::DeletedResponse,
            crate::dto::sse::RoomDeletedEvent,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Multiplayer room lifecycle"),
        (name = "sse", description = "Server-sent room streams"),
        (name = "players", description = "WebSocket operations for players"),
    )
)]
pub struct ApiDoc;
