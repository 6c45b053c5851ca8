use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{room_store::RoomStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to a durable room store, then watch its health.
///
/// While the backend is unreachable the shared state stays in degraded mode and room
/// operations fail with 503.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn RoomStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                info!("room store connected; leaving degraded mode");
                state.set_room_store(store.clone()).await;
                delay = INITIAL_DELAY;

                watch(&state, store.as_ref()).await;

                warn!("room store lost; dropping it and reconnecting from scratch");
                state.clear_room_store().await;
            }
            Err(err) => warn!(error = %err, "room store connection attempt failed"),
        }

        sleep(delay).await;
        delay = next_delay(delay);
    }
}

/// Poll the store until it fails and cannot be revived in place.
async fn watch(state: &SharedState, store: &dyn RoomStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded().await {
                    info!("room store healthy again; leaving degraded mode");
                    state.update_degraded(false).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "room store health check failed; entering degraded mode");
                state.update_degraded(true).await;
                if !reconnect(store).await {
                    return;
                }
                info!("room store reconnected");
                state.update_degraded(false).await;
            }
        }
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn reconnect(store: &dyn RoomStore) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "room store reconnect attempt failed");
                sleep(delay).await;
                delay = next_delay(delay);
            }
        }
    }
    false
}

fn next_delay(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{catalog::StaticCatalog, room_store::memory::MemoryRoomStore},
        state::{AppState, clock::ManualClock},
    };

    #[test]
    fn backoff_is_capped() {
        assert_eq!(next_delay(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(next_delay(Duration::from_secs(8)), MAX_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn supervisor_installs_store_after_failures() {
        let state = AppState::with_parts(
            AppConfig::default(),
            Arc::new(StaticCatalog::new(Vec::new())),
            Arc::new(ManualClock::new(0)),
        );
        assert!(state.is_degraded().await);

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let handle = tokio::spawn(run(state.clone(), move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(StorageError::Unavailable {
                        message: "connection refused".into(),
                        source: "refused".into(),
                    })
                } else {
                    Ok(Arc::new(MemoryRoomStore::new()) as Arc<dyn RoomStore>)
                }
            }
        }));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!state.is_degraded().await);
        assert!(state.room_store().await.is_some());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        handle.abort();
    }
}
