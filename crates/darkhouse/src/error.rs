//! Unified error type for the Darkhouse server.

use darkhouse_protocol::ProtocolError;
use darkhouse_session::SessionError;
use darkhouse_transport::TransportError;

/// Top-level error that wraps the errors of every layer.
///
/// The `#[from]` conversions let `?` lift sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum DarkhouseError {
    /// Connection, send or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encode or decode failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Room lookup or creation failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Bad setting at startup.
    #[error("invalid configuration: {0}")]
    Config(String),
}
