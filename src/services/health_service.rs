use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report storage health, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let active_rooms = state.tickers().len();
    let healthy = match state.require_room_store().await {
        Ok(store) => match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                false
            }
        },
        Err(_) => {
            warn!("storage unavailable (degraded mode)");
            false
        }
    };

    if healthy && !state.is_degraded().await {
        HealthResponse::ok(active_rooms)
    } else {
        HealthResponse::degraded(active_rooms)
    }
}
