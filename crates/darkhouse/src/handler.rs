//! Per-connection handler: greeting, intent routing and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbox queue and spawn the writer that drains it
//!   2. Send `welcome` with the connection's id
//!   3. Loop: receive frames → decode a `ClientIntent` → dispatch
//!   4. On close: leave the room, leave the game, drop the queue

use std::sync::Arc;

use darkhouse_protocol::{ClientIntent, Codec, ConnectionId, RoomId, ServerEvent};
use darkhouse_session::{Notifier, SessionState};
use darkhouse_transport::{Connection, WebSocketConnection};
use tokio::task::JoinHandle;

use crate::DarkhouseError;
use crate::outbox::EventReceiver;
use crate::server::ServerState;

/// Drop guard that runs disconnect handling when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, the async part runs in a fire-and-forget task.
struct DisconnectGuard<C: Codec> {
    connection_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let connection_id = self.connection_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Some(room_id) = state.controller.disconnect(connection_id).await {
                state.games.remove_player(&room_id, connection_id);
            }
            state.outbox.unregister(connection_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), DarkhouseError> {
    let conn = Arc::new(conn);
    let connection_id = conn.id();
    tracing::info!(%connection_id, peer = %conn.peer_addr(), "client connected");

    let events = state.outbox.register(connection_id);
    let mut writer = tokio::spawn(write_events(Arc::clone(&conn), events, Arc::clone(&state)));
    let _guard = DisconnectGuard {
        connection_id,
        state: Arc::clone(&state),
    };

    state
        .outbox
        .notify(connection_id, ServerEvent::Welcome { connection_id });

    // Only this task changes the connection's binding, so a local copy stays
    // in step with the directory.
    let mut room: Option<RoomId> = None;

    loop {
        let Some(received) = until_writer_stops(conn.recv(), &mut writer).await else {
            tracing::debug!(%connection_id, "writer stopped, closing");
            break;
        };
        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%connection_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%connection_id, error = %e, "recv error");
                break;
            }
        };

        let intent: ClientIntent = match state.codec.decode(&data) {
            Ok(intent) => intent,
            Err(e) => {
                tracing::debug!(%connection_id, error = %e, "failed to decode intent");
                state.outbox.notify(
                    connection_id,
                    ServerEvent::Error {
                        code: 400,
                        message: e.to_string(),
                    },
                );
                continue;
            }
        };

        dispatch(&state, connection_id, &mut room, intent).await;
    }

    // _guard drops here → disconnect handling fires, which also ends the
    // writer by unregistering its queue.
    Ok(())
}

/// Waits for `recv`, or gives up with `None` once the writer has stopped.
/// A connection that can no longer be written to is finished even if the
/// peer stays silent.
async fn until_writer_stops<T>(
    recv: impl Future<Output = T>,
    writer: &mut JoinHandle<()>,
) -> Option<T> {
    tokio::select! {
        received = recv => Some(received),
        _ = writer => None,
    }
}

/// Routes one intent. Failures have already been reported to the sender by
/// the controller, so they only matter here for bookkeeping.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    connection_id: ConnectionId,
    room: &mut Option<RoomId>,
    intent: ClientIntent,
) {
    match intent {
        ClientIntent::Create => {
            if let Ok(room_id) = state.controller.create(connection_id).await {
                move_to(state, connection_id, room, room_id);
            }
        }

        ClientIntent::Join { room_id } => {
            if state.controller.join(connection_id, &room_id).await.is_ok() {
                move_to(state, connection_id, room, room_id.clone());

                // Late joiners drop straight into a running game.
                let started = state
                    .controller
                    .registry()
                    .get_session(&room_id)
                    .await
                    .is_ok_and(|session| session.state() == SessionState::Started);
                if started {
                    state.games.start(&room_id, &[connection_id]);
                }
            }
        }

        ClientIntent::Start { room_id } => {
            // The game is seeded under the room lock, so a member leaving at
            // the same time is either left out or removed from the game.
            let _ = state
                .controller
                .start_with(connection_id, &room_id, |members| {
                    state.games.start(&room_id, members);
                })
                .await;
        }

        ClientIntent::Input { keys } => {
            if let Some(room_id) = room {
                state.games.input(room_id, connection_id, keys);
            }
        }

        ClientIntent::Flashlight { on } => {
            if let Some(room_id) = room {
                state.games.flashlight(room_id, connection_id, on);
            }
        }
    }
}

/// Records the new room and pulls the player out of the previous room's
/// game, if it had one.
fn move_to<C: Codec>(
    state: &ServerState<C>,
    connection_id: ConnectionId,
    room: &mut Option<RoomId>,
    room_id: RoomId,
) {
    if let Some(previous) = room.replace(room_id) {
        if room.as_ref() != Some(&previous) {
            state.games.remove_player(&previous, connection_id);
        }
    }
}

/// Drains the connection's outbox onto the socket until the queue closes or
/// a send fails.
async fn write_events<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut events: EventReceiver,
    state: Arc<ServerState<C>>,
) {
    let connection_id = conn.id();

    while let Some(event) = events.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%connection_id, error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%connection_id, error = %e, "send failed, writer stopping");
            return;
        }
    }

    let _ = conn.close().await;
}

#[cfg(test)]
mod tests {
    use std::future;

    use super::*;

    #[tokio::test]
    async fn test_silent_peer_released_when_writer_stops() {
        let mut writer = tokio::spawn(async {});
        let received = until_writer_stops(future::pending::<()>(), &mut writer).await;
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_frames_pass_through_while_writer_runs() {
        let mut writer = tokio::spawn(future::pending::<()>());
        let received = until_writer_stops(async { 7 }, &mut writer).await;
        assert_eq!(received, Some(7));
        writer.abort();
    }
}
