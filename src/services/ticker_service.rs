//! Background tickers driving playing rooms forward and pushing their snapshots.

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    services::room_service::{self, TickOutcome},
    state::SharedState,
};

/// Start the room's ticker unless one is already live.
pub fn ensure_ticker(state: &SharedState, room_id: &str) {
    let shared = state.clone();
    let id = room_id.to_string();
    let started = state
        .tickers()
        .start(room_id, move |generation| run_ticker(shared, id, generation));

    if started {
        info!(room_id, "room ticker started");
    }
}

async fn run_ticker(state: SharedState, room_id: String, generation: Uuid) {
    let mut ticks = interval(state.config().tick_interval());
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticks.tick().await;

    loop {
        ticks.tick().await;
        match room_service::advance_room(&state, &room_id).await {
            Ok(TickOutcome::Continue) => {}
            Ok(TickOutcome::Stop) => break,
            Err(err) => warn!(room_id = %room_id, error = %err, "room ticker step failed"),
        }
    }

    if state.tickers().finish(&room_id, generation) {
        info!(room_id = %room_id, "room ticker stopped");
    } else {
        debug!(room_id = %room_id, %generation, "ticker entry already replaced");
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{catalog::StaticCatalog, models::MovieEntity, room_store::memory::MemoryRoomStore},
        services::room_service::{PlayerAction, apply_action, get_room, join_room},
        state::{
            AppState,
            clock::ManualClock,
            progression::ProgressionMode,
            room::PlayerIdentity,
            state_machine::RoomStatus,
        },
    };

    fn catalog() -> Arc<StaticCatalog> {
        Arc::new(StaticCatalog::new((0..12).map(|i| MovieEntity {
            id: i.to_string(),
            title: format!("Movie {i}"),
            image_url: format!("https://img.example/{i}.jpg"),
            year: 2000,
            genre: "Drama".into(),
        })))
    }

    async fn playing_room(mode: ProgressionMode) -> (SharedState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let config = AppConfig::default().with_progression(mode);
        let state = AppState::with_parts(config, catalog(), clock.clone());
        state.set_room_store(Arc::new(MemoryRoomStore::new())).await;

        let alice = PlayerIdentity {
            id: "p1".into(),
            username: "Alice".into(),
        };
        join_room(&state, "ABC123", alice).await.unwrap();
        apply_action(&state, "ABC123", "p1", PlayerAction::Ready)
            .await
            .unwrap();
        (state, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn ticking_mode_counts_down_without_reads() {
        let (state, _clock) = playing_room(ProgressionMode::Ticking).await;
        let mut updates = state.room_hubs().subscribe("ABC123");
        assert!(state.tickers().is_running("ABC123"));

        tokio::time::sleep(Duration::from_millis(3_500)).await;

        let room = get_room(&state, "ABC123").await.unwrap();
        assert_eq!(room.timer, 7);
        assert_eq!(room.current_round_index, 0);
        assert!(updates.try_recv().is_ok());
        state.tickers().shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_stops_once_room_finishes() {
        let (state, _clock) = playing_room(ProgressionMode::Ticking).await;

        tokio::time::sleep(Duration::from_millis(100_500)).await;

        let room = get_room(&state, "ABC123").await.unwrap();
        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.current_round_index, 9);
        assert!(!state.tickers().is_running("ABC123"));
        assert!(state.tickers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn derived_mode_ticker_follows_the_clock() {
        let (state, clock) = playing_room(ProgressionMode::Derived).await;
        let mut updates = state.room_hubs().subscribe("ABC123");

        clock.advance(10_000);
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        let event = updates.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(value["currentRoundIndex"], 1);
        state.tickers().shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn exit_of_last_player_cancels_ticker() {
        let (state, _clock) = playing_room(ProgressionMode::Ticking).await;
        apply_action(&state, "ABC123", "p1", PlayerAction::Exit)
            .await
            .unwrap();

        assert!(state.tickers().is_empty());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(get_room(&state, "ABC123").await.is_err());
    }
}
