//! Room lifecycle for Darkhouse.
//!
//! This crate owns everything about who is in which room:
//!
//! 1. **Registry**: every live room, its members and its state
//!    ([`SessionRegistry`])
//! 2. **Directory**: the room each connection currently belongs to
//!    ([`ConnectionDirectory`])
//! 3. **Controller**: reacts to `create`/`join`/`start`/disconnect and tells
//!    the affected connections ([`SessionController`], [`Notifier`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)   ← feeds intents in, delivers notifications out
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol Layer (below)  ← RoomId, ConnectionId, ServerEvent
//! ```
//!
//! Nothing here is global: build one registry and one directory at startup
//! and hand them to the controller.

mod controller;
mod directory;
mod error;
mod id;
mod registry;
mod session;

pub use controller::{Notifier, SessionController};
pub use directory::ConnectionDirectory;
pub use error::SessionError;
pub use id::{RandomRoomIds, RoomIdGenerator, ROOM_CODE_SPACE};
pub use registry::{SessionRegistry, MAX_ID_ATTEMPTS};
pub use session::{Session, SessionState};
