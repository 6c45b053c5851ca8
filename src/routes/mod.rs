use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
};

use crate::{error::AppError, state::SharedState};

/// Swagger UI and OpenAPI document.
pub mod docs;
/// Liveness and storage status.
pub mod health;
/// Room REST endpoints.
pub mod rooms;
/// Room event streams.
pub mod sse;
/// Player WebSocket upgrade.
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(rooms::router())
        .merge(sse::router())
        .merge(websocket::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// JSON body extractor answering malformed bodies with a `{message}` 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor answering bad segments with a `{message}` 400.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
