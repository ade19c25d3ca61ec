//! Which room each live connection belongs to.

use std::collections::HashMap;

use darkhouse_protocol::{ConnectionId, RoomId};
use tokio::sync::RwLock;

/// Maps a connection to at most one room.
///
/// The binding is a lookup key only; the room's member list in
/// [`SessionRegistry`](crate::SessionRegistry) is the source of truth for
/// membership.
#[derive(Debug, Default)]
pub struct ConnectionDirectory {
    bindings: RwLock<HashMap<ConnectionId, RoomId>>,
}

impl ConnectionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `connection_id` is in `room_id`, replacing any earlier
    /// binding. Returns the replaced binding.
    pub async fn bind(&self, connection_id: ConnectionId, room_id: RoomId) -> Option<RoomId> {
        let previous = self.bindings.write().await.insert(connection_id, room_id);
        if let Some(previous) = &previous {
            tracing::debug!(%connection_id, %previous, "connection rebound");
        }
        previous
    }

    /// Clears the binding and returns it, if any.
    pub async fn unbind(&self, connection_id: ConnectionId) -> Option<RoomId> {
        self.bindings.write().await.remove(&connection_id)
    }

    pub async fn lookup(&self, connection_id: ConnectionId) -> Option<RoomId> {
        self.bindings.read().await.get(&connection_id).cloned()
    }

    /// Number of bound connections.
    pub async fn len(&self) -> usize {
        self.bindings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bindings.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[tokio::test]
    async fn test_bind_then_lookup() {
        let directory = ConnectionDirectory::new();
        assert_eq!(directory.bind(cid(1), RoomId::new("a")).await, None);
        assert_eq!(directory.lookup(cid(1)).await, Some(RoomId::new("a")));
        assert_eq!(directory.lookup(cid(2)).await, None);
    }

    #[tokio::test]
    async fn test_bind_overwrites_and_returns_previous() {
        let directory = ConnectionDirectory::new();
        directory.bind(cid(1), RoomId::new("a")).await;

        let previous = directory.bind(cid(1), RoomId::new("b")).await;
        assert_eq!(previous, Some(RoomId::new("a")));
        assert_eq!(directory.lookup(cid(1)).await, Some(RoomId::new("b")));
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn test_unbind_clears_binding() {
        let directory = ConnectionDirectory::new();
        directory.bind(cid(1), RoomId::new("a")).await;

        assert_eq!(directory.unbind(cid(1)).await, Some(RoomId::new("a")));
        assert_eq!(directory.unbind(cid(1)).await, None);
        assert!(directory.is_empty().await);
    }
}
