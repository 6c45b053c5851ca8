//! CineGuess Back binary entrypoint wiring REST, WebSocket, SSE, and the room store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(any(feature = "mongo-store", feature = "couch-store"))]
use cineguess_back::dao::{room_store::RoomStore, storage::StorageError};
use cineguess_back::{
    config::AppConfig,
    dao::room_store::memory::MemoryRoomStore,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    install_room_store(&app_state).await?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    app_state.tickers().shutdown();
    info!("server stopped");
    Ok(())
}

/// Pick the room store named by `ROOM_STORE` (`memory` by default).
///
/// Durable stores are connected by the storage supervisor in the background.
async fn install_room_store(state: &SharedState) -> anyhow::Result<()> {
    let kind = env::var("ROOM_STORE").unwrap_or_else(|_| "memory".into());
    match kind.as_str() {
        "memory" => {
            state.set_room_store(Arc::new(MemoryRoomStore::new())).await;
            info!("using in-memory room store");
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            use cineguess_back::dao::room_store::mongodb::{MongoConfig, MongoRoomStore};

            info!("connecting to MongoDB room store");
            tokio::spawn(cineguess_back::services::storage_supervisor::run(
                state.clone(),
                || async {
                    let config = MongoConfig::from_env().await?;
                    let store = MongoRoomStore::connect(config).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn RoomStore>)
                },
            ));
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            use cineguess_back::dao::room_store::couchdb::{CouchConfig, CouchRoomStore};

            info!("connecting to CouchDB room store");
            tokio::spawn(cineguess_back::services::storage_supervisor::run(
                state.clone(),
                || async {
                    let config = CouchConfig::from_env()?;
                    let store = CouchRoomStore::connect(config).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn RoomStore>)
                },
            ));
        }
        other => bail!("unsupported ROOM_STORE `{other}`"),
    }
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
