use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        validation::{validate_room_code, validate_username_len},
        ws::ClientMessage,
    },
    error::ServiceError,
    services::{
        room_events::send_error,
        room_service::{self, ActionOutcome, PlayerAction},
    },
    state::{PlayerConnection, SharedState, room::PlayerIdentity},
};

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Membership established by the first `JOIN_ROOM` message of a socket.
#[derive(Debug)]
struct Session {
    connection_id: Uuid,
    room_id: String,
    player_id: String,
}

/// Handle the full lifecycle for an individual player WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(JOIN_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket join timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let session = match join(&state, &initial_message, &outbound_tx).await {
        Ok(session) => session,
        Err(err) => {
            warn!(error = %err, "websocket join rejected");
            send_error(&outbound_tx, err.to_string());
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let mut exited = false;
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if on_text(&state, &session, &outbound_tx, &text).await {
                    exited = true;
                    break;
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(player_id = %session.player_id, error = %err, "websocket error");
                break;
            }
        }
    }

    teardown(&state, &session, exited).await;
    finalize(writer_task, outbound_tx).await;
}

/// Parse the first frame, register the socket and join the room.
async fn join(
    state: &SharedState,
    payload: &str,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<Session, ServiceError> {
    let message = ClientMessage::from_json_str(payload)
        .map_err(|err| ServiceError::InvalidInput(format!("malformed message: {err}")))?;

    let ClientMessage::JoinRoom { room_id, player } = message else {
        return Err(ServiceError::InvalidInput(
            "first message must be JOIN_ROOM".into(),
        ));
    };

    validate_room_code(&room_id)
        .map_err(|err| ServiceError::InvalidInput(format!("invalid roomId: {err}")))?;
    player
        .validate()
        .map_err(|err| ServiceError::InvalidInput(format!("invalid player: {err}")))?;

    let identity = PlayerIdentity::from(player);
    let session = Session {
        connection_id: Uuid::new_v4(),
        room_id,
        player_id: identity.id.clone(),
    };

    // Registered before joining so the join broadcast reaches this socket too.
    if let Some(previous) = state.connections().insert(
        session.player_id.clone(),
        PlayerConnection {
            connection_id: session.connection_id,
            room_id: session.room_id.clone(),
            tx: tx.clone(),
        },
    ) {
        info!(player_id = %session.player_id, room_id = %previous.room_id, "replacing previous player socket");
    }

    if let Err(err) = room_service::join_room(state, &session.room_id, identity).await {
        unregister(state, &session);
        return Err(err);
    }

    info!(room_id = %session.room_id, player_id = %session.player_id, "player socket joined");
    Ok(session)
}

/// Handle one text frame, answering failures with `ERROR`. Returns `true` once the player left.
async fn on_text(
    state: &SharedState,
    session: &Session,
    tx: &mpsc::UnboundedSender<Message>,
    payload: &str,
) -> bool {
    match handle_message(state, session, payload).await {
        Ok(left) => left,
        Err(err) => {
            warn!(
                room_id = %session.room_id,
                player_id = %session.player_id,
                error = %err,
                "player message failed"
            );
            send_error(tx, err.to_string());
            false
        }
    }
}

/// Apply one inbound message. Returns `true` when the player left the room.
async fn handle_message(
    state: &SharedState,
    session: &Session,
    payload: &str,
) -> Result<bool, ServiceError> {
    let message = ClientMessage::from_json_str(payload)
        .map_err(|err| ServiceError::InvalidInput(format!("malformed message: {err}")))?;

    let action = match message {
        ClientMessage::Ready => PlayerAction::Ready,
        ClientMessage::Rename { username } => {
            validate_username_len(&username)
                .map_err(|err| ServiceError::InvalidInput(format!("invalid username: {err}")))?;
            PlayerAction::Rename { username }
        }
        ClientMessage::SubmitAnswer {
            is_correct,
            movie_id,
        } => PlayerAction::SubmitAnswer {
            movie_id,
            is_correct,
        },
        ClientMessage::Exit => PlayerAction::Exit,
        ClientMessage::JoinRoom { .. } => {
            return Err(ServiceError::InvalidState(
                "socket already joined a room".into(),
            ));
        }
        ClientMessage::Unknown => {
            return Err(ServiceError::InvalidInput("unknown message type".into()));
        }
    };

    let leaving = action == PlayerAction::Exit;
    room_service::apply_action(state, &session.room_id, &session.player_id, action).await?;
    Ok(leaving)
}

/// Remove the player from its room unless a newer socket took over.
async fn teardown(state: &SharedState, session: &Session, exited: bool) {
    if !unregister(state, session) || exited {
        info!(player_id = %session.player_id, "player socket closed");
        return;
    }

    match room_service::apply_action(
        state,
        &session.room_id,
        &session.player_id,
        PlayerAction::Exit,
    )
    .await
    {
        Ok(ActionOutcome::Updated(_)) | Ok(ActionOutcome::Deleted { .. }) => {
            info!(room_id = %session.room_id, player_id = %session.player_id, "player disconnected; left room");
        }
        Err(ServiceError::NotFound(_)) => {}
        Err(err) => {
            warn!(room_id = %session.room_id, player_id = %session.player_id, error = %err, "failed to remove disconnected player");
        }
    }
}

/// Drop the connection entry if it still belongs to this socket.
fn unregister(state: &SharedState, session: &Session) -> bool {
    state
        .connections()
        .remove_if(&session.player_id, |_, connection| {
            connection.connection_id == session.connection_id
        })
        .is_some()
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
