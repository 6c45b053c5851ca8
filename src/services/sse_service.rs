use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dto::{
        room::RoomSnapshot,
        sse::{ROOM_UPDATE_EVENT, ServerEvent},
    },
    error::ServiceError,
    services::room_service,
    state::SharedState,
};

/// Subscribe to a room's stream, returning the receiver and the current snapshot as first event.
pub async fn subscribe_room(
    state: &SharedState,
    room_id: &str,
) -> Result<(broadcast::Receiver<ServerEvent>, ServerEvent), ServiceError> {
    let receiver = state.room_hubs().subscribe(room_id);
    let room = match room_service::get_room(state, room_id).await {
        Ok(room) => room,
        Err(err) => {
            drop(receiver);
            state.room_hubs().release(room_id);
            return Err(err);
        }
    };

    let initial = ServerEvent::json(
        Some(ROOM_UPDATE_EVENT.to_string()),
        &RoomSnapshot::from(&room),
    )
    .map_err(|err| ServiceError::InvalidState(format!("failed to encode snapshot: {err}")))?;

    Ok((receiver, initial))
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: ServerEvent,
    room_id: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if tx.send(Ok(to_event(initial))).await.is_ok() {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    recv_result = receiver.recv() => {
                        match recv_result {
                            Ok(payload) => {
                                if tx.send(Ok(to_event(payload))).await.is_err() {
                                    break;
                                }
                            }
                            Err(RecvError::Closed) => break,
                            Err(RecvError::Lagged(skipped)) => {
                                debug!(room_id = %room_id, skipped, "room SSE subscriber lagged");
                                continue;
                            }
                        }
                    }
                }
            }
        }

        info!(room_id = %room_id, "room SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
