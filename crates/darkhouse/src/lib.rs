//! # Darkhouse
//!
//! Server for a small real-time multiplayer game played in the dark.
//!
//! Browsers connect over WebSocket, gather in rooms of up to four, and once
//! a room starts the server runs a fixed-rate game loop that integrates
//! every player's movement and broadcasts the result.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use darkhouse::prelude::*;
//!
//! # async fn run() -> Result<(), DarkhouseError> {
//! let server = DarkhouseServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod game;
mod handler;
mod outbox;
mod server;

pub use config::{ENV_ADDR, ENV_TICK_RATE, ServerConfig};
pub use error::DarkhouseError;
pub use game::{SPAWN_OFFSET, spawn_point};
pub use server::{DarkhouseServer, DarkhouseServerBuilder};

/// Everything needed to run a server or talk to one in tests.
pub mod prelude {
    pub use crate::{DarkhouseError, DarkhouseServer, DarkhouseServerBuilder, ServerConfig};
    pub use darkhouse_protocol::{
        ClientIntent, Codec, ConnectionId, JsonCodec, PlayerSnapshot, RoomId, ServerEvent,
    };
    pub use darkhouse_sim::{MovementFlags, PlayerState, Vec3};
}
