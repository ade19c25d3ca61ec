//! Messages exchanged between browser clients and the server.
//!
//! Both directions are internally tagged JSON objects with a snake_case
//! `"type"` field, e.g. `{"type":"join","room_id":"4821"}`.

use std::fmt;

use darkhouse_sim::{MovementFlags, PlayerState};
use darkhouse_transport::ConnectionId;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// Opaque identifier of a room, short enough to read out or put in a link.
///
/// Always serialized as a string. Deserialization also accepts a bare
/// number, since clients that echo back a freshly created id or parse one
/// from a URL path do not agree on which they send.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
            Float(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Ok(Self(text)),
            Raw::Number(number) => Ok(Self(number.to_string())),
            // JavaScript numbers may arrive as `4821.0`.
            Raw::Float(number)
                if number >= 0.0 && number.fract() == 0.0 && number < 2f64.powi(53) =>
            {
                Ok(Self((number as u64).to_string()))
            }
            Raw::Float(number) => Err(serde::de::Error::custom(format!(
                "room id must be a whole number, got {number}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Something a connection asks the server to do.
///
/// Disconnecting is not a message: the server reacts to the socket closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIntent {
    /// Open a new room with the sender as host.
    Create,
    /// Enter an existing room.
    Join { room_id: RoomId },
    /// Begin the game in a room.
    Start { room_id: RoomId },
    /// Current state of the movement keys.
    Input { keys: MovementFlags },
    /// Switch the flashlight on or off.
    Flashlight { on: bool },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// One player's state inside a [`ServerEvent::WorldState`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub connection_id: ConnectionId,
    #[serde(flatten)]
    pub state: PlayerState,
}

/// A notification sent to one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First message on every connection: who you are.
    Welcome { connection_id: ConnectionId },
    /// To the creator: the room exists and you are in it.
    Created { room_id: RoomId },
    /// To a joiner: the room and everyone already in it, in join order.
    Joined {
        room_id: RoomId,
        members: Vec<ConnectionId>,
    },
    /// To existing members: someone joined.
    MemberJoined {
        room_id: RoomId,
        connection_id: ConnectionId,
    },
    /// To remaining members: someone left.
    MemberLeft { connection_id: ConnectionId },
    /// To every member: the game has begun.
    Started,
    /// To a requester: no room has this id.
    RoomNotFound { room_id: RoomId },
    /// To every player in a running game, once per tick.
    WorldState {
        tick: u64,
        players: Vec<PlayerSnapshot>,
    },
    /// To a requester: the message could not be handled. `code` follows
    /// HTTP conventions.
    Error { code: u16, message: String },
}
