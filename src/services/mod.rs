/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Fan-out of room updates to sockets and SSE listeners.
pub mod room_events;
pub mod room_service;
/// Room event streams for observers.
pub mod sse_service;
/// Background reconnection of the room store.
pub mod storage_supervisor;
pub mod ticker_service;
/// Player WebSocket sessions.
pub mod websocket_service;
