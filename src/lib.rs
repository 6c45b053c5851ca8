//! Library crate for cineguess-back, exposing modules for binaries and integration tests.

/// Runtime configuration and the seed movie catalog.
pub mod config;
/// Persistence: movie catalog and room stores.
pub mod dao;
/// Wire types for REST, WebSocket and SSE payloads.
pub mod dto;
/// Error types shared by services and handlers.
pub mod error;
/// HTTP route trees.
pub mod routes;
/// Room rules, tickers and connection handling.
pub mod services;
/// Shared application state and the room model.
pub mod state;
