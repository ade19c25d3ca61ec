//! A single room: who is in it and whether the game has begun.

use std::fmt;

use darkhouse_protocol::{ConnectionId, RoomId};

/// Lifecycle of a room.
///
/// ```text
/// Lobby ──(start)──→ Started
/// ```
///
/// Joining stays open after the start, and starting again is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Lobby,
    Started,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => f.write_str("Lobby"),
            Self::Started => f.write_str("Started"),
        }
    }
}

/// One room and its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: RoomId,
    host: ConnectionId,
    /// Join order, no duplicates.
    members: Vec<ConnectionId>,
    state: SessionState,
    /// Set when the registry drops this room. A caller still holding the
    /// handle treats it as gone.
    retired: bool,
}

impl Session {
    pub(crate) fn new(id: RoomId, host: ConnectionId) -> Self {
        Self {
            id,
            host,
            members: vec![host],
            state: SessionState::Lobby,
            retired: false,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// The connection that created the room.
    pub fn host(&self) -> ConnectionId {
        self.host
    }

    /// Current members in join order.
    pub fn members(&self) -> &[ConnectionId] {
        &self.members
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.members.contains(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Adds `connection_id` unless already present and returns everyone
    /// else in the room, in join order.
    pub(crate) fn add_member(&mut self, connection_id: ConnectionId) -> Vec<ConnectionId> {
        if !self.contains(connection_id) {
            self.members.push(connection_id);
        }
        self.others(connection_id)
    }

    /// Returns `true` if the connection was a member.
    pub(crate) fn remove_member(&mut self, connection_id: ConnectionId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| *member != connection_id);
        self.members.len() != before
    }

    /// Returns `true` on the `Lobby → Started` transition, `false` if the
    /// room was already started.
    pub(crate) fn start(&mut self) -> bool {
        let was_lobby = self.state == SessionState::Lobby;
        self.state = SessionState::Started;
        was_lobby
    }

    pub(crate) fn others(&self, connection_id: ConnectionId) -> Vec<ConnectionId> {
        self.members
            .iter()
            .copied()
            .filter(|member| *member != connection_id)
            .collect()
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }

    pub(crate) fn is_retired(&self) -> bool {
        self.retired
    }
}
