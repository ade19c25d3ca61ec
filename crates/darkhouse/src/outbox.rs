//! Per-connection outbound queues.
//!
//! Every connection handler registers here and gets a receiver that its
//! writer task drains onto the socket. The session controller and the game
//! loops push into the matching sender without touching the socket, so a
//! slow peer never stalls a room.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use darkhouse_protocol::{ConnectionId, ServerEvent};
use darkhouse_session::Notifier;
use tokio::sync::mpsc;

pub(crate) type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

#[derive(Default)]
pub(crate) struct Outbox {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl Outbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, connection_id: ConnectionId) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection_id, tx);
        rx
    }

    /// Drops the sender, which ends the connection's writer task once the
    /// queue is drained.
    pub(crate) fn unregister(&self, connection_id: ConnectionId) {
        self.senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&connection_id);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.senders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Notifier for Outbox {
    fn notify(&self, to: ConnectionId, event: ServerEvent) {
        let senders = self.senders.read().unwrap_or_else(PoisonError::into_inner);
        match senders.get(&to) {
            Some(sender) => {
                if sender.send(event).is_err() {
                    tracing::debug!(connection_id = %to, "writer gone, event dropped");
                }
            }
            None => tracing::trace!(connection_id = %to, "no outbox, event dropped"),
        }
    }
}
