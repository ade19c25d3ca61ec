//! The session registry: every live room, keyed by id.
//!
//! # Concurrency
//!
//! The map itself sits behind an `RwLock` that is only held long enough to
//! look up, insert or drop an entry. Each room then has its own `Mutex`, so
//! joins, starts and departures against one room serialize while different
//! rooms never contend.

use std::collections::HashMap;
use std::sync::Arc;

use darkhouse_protocol::{ConnectionId, RoomId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{RandomRoomIds, RoomIdGenerator, Session, SessionError};

/// How many fresh ids to try before giving up on a create.
pub const MAX_ID_ATTEMPTS: u32 = 32;

type SessionHandle = Arc<Mutex<Session>>;

/// In-memory table of rooms.
///
/// Construct one per server and share it by `Arc`; there is no global
/// instance.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<RoomId, SessionHandle>>,
    ids: Box<dyn RoomIdGenerator>,
}

impl SessionRegistry {
    /// Creates an empty registry that hands out random numeric room codes.
    pub fn new() -> Self {
        Self::with_generator(RandomRoomIds)
    }

    pub fn with_generator(ids: impl RoomIdGenerator) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ids: Box::new(ids),
        }
    }

    /// Opens a room in `Lobby` with `host` as its only member.
    ///
    /// # Errors
    /// [`SessionError::IdSpaceExhausted`] if [`MAX_ID_ATTEMPTS`] generated
    /// ids in a row were already taken.
    pub async fn create_session(&self, host: ConnectionId) -> Result<RoomId, SessionError> {
        let mut sessions = self.sessions.write().await;

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let room_id = self.ids.next_id();
            if sessions.contains_key(&room_id) {
                tracing::debug!(%room_id, attempt, "room id collision, retrying");
                continue;
            }

            let session = Session::new(room_id.clone(), host);
            sessions.insert(room_id.clone(), Arc::new(Mutex::new(session)));
            tracing::info!(%room_id, %host, "room created");
            return Ok(room_id);
        }

        tracing::warn!(attempts = MAX_ID_ATTEMPTS, "could not allocate a room id");
        Err(SessionError::IdSpaceExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Returns a copy of the room as it is right now.
    pub async fn get_session(&self, room_id: &RoomId) -> Result<Session, SessionError> {
        let session = self.lock(room_id).await?;
        Ok(session.clone())
    }

    /// Adds `connection_id` to the room if absent.
    ///
    /// Returns the other members in join order. Joining a started room is
    /// allowed.
    pub async fn add_member(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Result<Vec<ConnectionId>, SessionError> {
        let mut session = self.lock(room_id).await?;
        Ok(session.add_member(connection_id))
    }

    /// Removes `connection_id` from the room.
    ///
    /// A missing room or a non-member is not an error. Returns `true` if
    /// someone was actually removed. An emptied room stays registered until
    /// [`prune_empty`](Self::prune_empty).
    pub async fn remove_member(&self, room_id: &RoomId, connection_id: ConnectionId) -> bool {
        match self.lock(room_id).await {
            Ok(mut session) => session.remove_member(connection_id),
            Err(_) => false,
        }
    }

    /// Moves the room to `Started`. Starting an already started room
    /// succeeds again.
    pub async fn start_session(&self, room_id: &RoomId) -> Result<(), SessionError> {
        let mut session = self.lock(room_id).await?;
        session.start();
        Ok(())
    }

    /// Drops every room with no members and returns how many went.
    ///
    /// Rooms that are locked at the moment are left for the next pass.
    pub async fn prune_empty(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|room_id, handle| match handle.try_lock() {
            Ok(mut session) if session.is_empty() => {
                session.retire();
                tracing::debug!(%room_id, "pruned empty room");
                false
            }
            _ => true,
        });

        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::info!(pruned, remaining = sessions.len(), "pruned empty rooms");
        }
        pruned
    }

    /// Number of registered rooms, empty ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Locks one room for a compound update.
    ///
    /// The map lock is released before waiting on the room, so a slow room
    /// never blocks lookups of other rooms.
    pub(crate) async fn lock(
        &self,
        room_id: &RoomId,
    ) -> Result<OwnedMutexGuard<Session>, SessionError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| SessionError::RoomNotFound(room_id.clone()))?;

        let session = handle.lock_owned().await;
        if session.is_retired() {
            return Err(SessionError::RoomNotFound(room_id.clone()));
        }
        Ok(session)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::SessionState;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    /// Yields "0", "0", "1", "1", "2", ... so every other id collides.
    fn stuttering_ids() -> impl RoomIdGenerator {
        let counter = AtomicU64::new(0);
        move || RoomId::new((counter.fetch_add(1, Ordering::Relaxed) / 2).to_string())
    }

    // =====================================================================
    // create_session()
    // =====================================================================

    #[tokio::test]
    async fn test_create_session_registers_lobby_with_host() {
        let registry = SessionRegistry::new();
        let room_id = registry.create_session(cid(1)).await.unwrap();

        let session = registry.get_session(&room_id).await.unwrap();
        assert_eq!(session.id(), &room_id);
        assert_eq!(session.host(), cid(1));
        assert_eq!(session.members(), &[cid(1)]);
        assert_eq!(session.state(), SessionState::Lobby);
    }

    #[tokio::test]
    async fn test_create_session_ids_are_distinct() {
        let registry = SessionRegistry::new();
        let mut seen = HashSet::new();

        for i in 0..2_000 {
            let room_id = registry.create_session(cid(i)).await.unwrap();
            assert!(seen.insert(room_id), "duplicate room id");
        }
        assert_eq!(registry.len().await, 2_000);
    }

    #[tokio::test]
    async fn test_create_session_retries_on_collision() {
        let registry = SessionRegistry::with_generator(stuttering_ids());

        let first = registry.create_session(cid(1)).await.unwrap();
        let second = registry.create_session(cid(2)).await.unwrap();

        assert_eq!(first, RoomId::new("0"));
        assert_eq!(second, RoomId::new("1"));
    }

    #[tokio::test]
    async fn test_create_session_gives_up_when_ids_run_out() {
        let registry = SessionRegistry::with_generator(|| RoomId::new("same"));
        registry.create_session(cid(1)).await.unwrap();

        let result = registry.create_session(cid(2)).await;
        assert_eq!(
            result,
            Err(SessionError::IdSpaceExhausted {
                attempts: MAX_ID_ATTEMPTS
            })
        );
        assert_eq!(registry.len().await, 1);
    }

    // =====================================================================
    // get_session() / add_member() / remove_member() / start_session()
    // =====================================================================

    #[tokio::test]
    async fn test_get_session_unknown_is_not_found() {
        let registry = SessionRegistry::new();
        let missing = RoomId::new("nope");
        assert_eq!(
            registry.get_session(&missing).await,
            Err(SessionError::RoomNotFound(missing))
        );
    }

    #[tokio::test]
    async fn test_add_member_returns_prior_members() {
        let registry = SessionRegistry::new();
        let room_id = registry.create_session(cid(1)).await.unwrap();

        assert_eq!(registry.add_member(&room_id, cid(2)).await.unwrap(), vec![cid(1)]);
        assert_eq!(
            registry.add_member(&room_id, cid(3)).await.unwrap(),
            vec![cid(1), cid(2)]
        );
    }

    #[tokio::test]
    async fn test_add_member_to_started_room_is_allowed() {
        let registry = SessionRegistry::new();
        let room_id = registry.create_session(cid(1)).await.unwrap();
        registry.start_session(&room_id).await.unwrap();

        assert!(registry.add_member(&room_id, cid(2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_add_member_unknown_room_is_not_found() {
        let registry = SessionRegistry::new();
        let result = registry.add_member(&RoomId::new("x"), cid(1)).await;
        assert!(matches!(result, Err(SessionError::RoomNotFound(_))));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_member_is_noop_when_absent() {
        let registry = SessionRegistry::new();
        let room_id = registry.create_session(cid(1)).await.unwrap();

        assert!(!registry.remove_member(&room_id, cid(9)).await);
        assert!(!registry.remove_member(&RoomId::new("x"), cid(1)).await);
        assert!(registry.remove_member(&room_id, cid(1)).await);

        // The empty shell stays registered.
        let session = registry.get_session(&room_id).await.unwrap();
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_start_session_is_idempotent() {
        let registry = SessionRegistry::new();
        let room_id = registry.create_session(cid(1)).await.unwrap();

        registry.start_session(&room_id).await.unwrap();
        registry.start_session(&room_id).await.unwrap();

        let session = registry.get_session(&room_id).await.unwrap();
        assert_eq!(session.state(), SessionState::Started);
    }

    // =====================================================================
    // prune_empty()
    // =====================================================================

    #[tokio::test]
    async fn test_prune_empty_drops_only_empty_rooms() {
        let registry = SessionRegistry::new();
        let empty = registry.create_session(cid(1)).await.unwrap();
        let busy = registry.create_session(cid(2)).await.unwrap();
        registry.remove_member(&empty, cid(1)).await;

        assert_eq!(registry.prune_empty().await, 1);
        assert!(registry.get_session(&empty).await.is_err());
        assert!(registry.get_session(&busy).await.is_ok());
    }

    #[tokio::test]
    async fn test_prune_empty_skips_locked_rooms() {
        let registry = SessionRegistry::new();
        let room_id = registry.create_session(cid(1)).await.unwrap();
        registry.remove_member(&room_id, cid(1)).await;

        let guard = registry.lock(&room_id).await.unwrap();
        assert_eq!(registry.prune_empty().await, 0);
        drop(guard);

        assert_eq!(registry.prune_empty().await, 1);
    }

    #[tokio::test]
    async fn test_pruned_room_id_can_be_reused() {
        let registry = SessionRegistry::with_generator(|| RoomId::new("42"));
        let room_id = registry.create_session(cid(1)).await.unwrap();
        registry.remove_member(&room_id, cid(1)).await;
        registry.prune_empty().await;

        let reused = registry.create_session(cid(2)).await.unwrap();
        assert_eq!(reused, room_id);
        let session = registry.get_session(&reused).await.unwrap();
        assert_eq!(session.members(), &[cid(2)]);
    }
}
