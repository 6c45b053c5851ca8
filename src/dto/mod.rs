/// Health endpoint payloads.
pub mod health;
/// Room snapshots and REST request bodies.
pub mod room;
/// Server-sent event payloads.
pub mod sse;
pub mod validation;
/// WebSocket message envelopes.
pub mod ws;
