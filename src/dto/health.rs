use serde::Serialize;
use utoipa::ToSchema;

/// Payload of `GET /api/health`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Rooms currently driven by a ticker.
    pub active_rooms: usize,
}

impl HealthResponse {
    /// Storage is reachable.
    pub fn ok(active_rooms: usize) -> Self {
        Self {
            status: "ok".to_string(),
            active_rooms,
        }
    }

    /// No storage backend is installed or it failed its health check.
    pub fn degraded(active_rooms: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            active_rooms,
        }
    }
}
