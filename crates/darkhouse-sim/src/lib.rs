//! Shared simulation for Darkhouse.
//!
//! Both the server and the presentation layer run this crate so that a
//! player's position, facing and walk cycle come out the same on every
//! peer.
//!
//! # Key types
//!
//! - [`integrate`]: the pure per-tick movement step
//! - [`Player`]: kinematic state, held movement keys, flashlight
//! - [`Pose`]: limb offsets derived from the animation phase
//! - [`TickScheduler`]: fixed-timestep clock for the game loop
//!
//! Nothing here knows about rooms, connections or the network.

mod movement;
mod player;
mod pose;
mod tick;

pub use movement::{
    ANIMATION_STEP_SPEED, Kinematics, MOVE_SPEED_AXIAL, MOVE_SPEED_DIAGONAL,
    MovementFlags, ROTATE_SPEED, Vec2, Vec3, facing_angle, integrate,
    rotate_toward,
};
pub use player::{
    COLLISION_DISTANCE, EYE_HEIGHT, MAX_FLASHLIGHT_INTENSITY, Player,
    PlayerState,
};
pub use pose::{FOOT_AMPLITUDE, HAND_AMPLITUDE, Pose};
pub use tick::{TickConfig, TickInfo, TickPolicy, TickScheduler};
