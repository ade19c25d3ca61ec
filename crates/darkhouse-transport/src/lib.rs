//! Transport layer for Darkhouse.
//!
//! The game core never touches sockets. It sees a [`ConnectionId`] per live
//! endpoint, and the server moves bytes through the [`Transport`] and
//! [`Connection`] traits.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle for one live connection, unique for the life of the
/// process.
///
/// Serialized as a bare number so clients can list room members.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Produces new connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer and completes its handshake.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// A bidirectional, message-oriented connection.
///
/// `send` and `recv` may be called concurrently from different tasks.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Waits for the next message. `Ok(None)` means the peer closed the
    /// connection cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
