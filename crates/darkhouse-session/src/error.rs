//! Error types for the session layer.

use darkhouse_protocol::RoomId;

/// Errors from room operations.
///
/// All of them are scoped to the connection that asked; none is fatal to
/// the server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No live room has this id.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// Every generated id collided with a live room.
    #[error("no free room id after {attempts} attempts")]
    IdSpaceExhausted { attempts: u32 },
}
