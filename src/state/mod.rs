/// Time sources.
pub mod clock;
/// How playing rooms advance between rounds.
pub mod progression;
/// Room aggregate and the rules applied to it.
pub mod room;
mod sse;
/// Room status transitions.
pub mod state_machine;
/// Per-room background tasks.
pub mod tickers;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        catalog::{MovieCatalog, StaticCatalog},
        room_store::RoomStore,
    },
    error::ServiceError,
    state::{clock::SystemClock, room::RoundRules},
};

pub use self::clock::Clock;
pub use self::sse::{RoomHubs, SseHub};
pub use self::tickers::RoomTickers;

/// State shared by every handler and background task.
pub type SharedState = Arc<AppState>;

const ROOM_SSE_CAPACITY: usize = 32;

#[derive(Clone)]
/// Handle used to push messages to a player's socket.
pub struct PlayerConnection {
    /// Distinguishes successive sockets opened by the same player.
    pub connection_id: Uuid,
    /// Room the socket joined.
    pub room_id: String,
    /// Writer queue of the socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state storing live connections, tickers and the storage handle.
pub struct AppState {
    room_store: RwLock<Option<Arc<dyn RoomStore>>>,
    catalog: Arc<dyn MovieCatalog>,
    clock: Arc<dyn Clock>,
    config: AppConfig,
    connections: DashMap<String, PlayerConnection>,
    tickers: RoomTickers,
    room_hubs: RoomHubs,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct the state with the configured catalog and the system clock.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let catalog = Arc::new(StaticCatalog::new(config.movies().iter().cloned()));
        Self::with_parts(config, catalog, Arc::new(SystemClock))
    }

    /// Construct the state from explicit collaborators.
    pub fn with_parts(
        config: AppConfig,
        catalog: Arc<dyn MovieCatalog>,
        clock: Arc<dyn Clock>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            room_store: RwLock::new(None),
            catalog,
            clock,
            config,
            connections: DashMap::new(),
            tickers: RoomTickers::new(),
            room_hubs: RoomHubs::new(ROOM_SSE_CAPACITY),
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current room store, if one is installed.
    pub async fn room_store(&self) -> Option<Arc<dyn RoomStore>> {
        let guard = self.room_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the room store or fail with [`ServiceError::Degraded`].
    pub async fn require_room_store(&self) -> Result<Arc<dyn RoomStore>, ServiceError> {
        self.room_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new room store implementation and leave degraded mode.
    pub async fn set_room_store(&self, store: Arc<dyn RoomStore>) {
        {
            let mut guard = self.room_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current room store and enter degraded mode.
    pub async fn clear_room_store(&self) {
        {
            let mut guard = self.room_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Round rules derived from the configuration.
    pub fn rules(&self) -> RoundRules {
        self.config.rules()
    }

    /// Movie catalog rooms draw from.
    pub fn catalog(&self) -> &Arc<dyn MovieCatalog> {
        &self.catalog
    }

    /// Current wall-clock time in epoch milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Registry of open player sockets keyed by player id.
    pub fn connections(&self) -> &DashMap<String, PlayerConnection> {
        &self.connections
    }

    /// Background tickers of playing rooms.
    pub fn tickers(&self) -> &RoomTickers {
        &self.tickers
    }

    /// Per-room SSE hubs.
    pub fn room_hubs(&self) -> &RoomHubs {
        &self.room_hubs
    }
}
