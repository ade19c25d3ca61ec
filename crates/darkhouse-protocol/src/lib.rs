//! Wire protocol for Darkhouse.
//!
//! - **Types** ([`ClientIntent`], [`ServerEvent`], [`RoomId`],
//!   [`PlayerSnapshot`]): what travels between browser and server.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how those values become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (intents/events) → Session controller
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use darkhouse_transport::ConnectionId;
pub use error::ProtocolError;
pub use types::{ClientIntent, PlayerSnapshot, RoomId, ServerEvent};
