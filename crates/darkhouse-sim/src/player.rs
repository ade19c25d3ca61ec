//! The player entity: kinematic state plus the devices a player carries.
//!
//! Rendering concerns (meshes, lights) live elsewhere and read from this
//! struct; nothing here knows how a player is drawn.

use serde::{Deserialize, Serialize};

use crate::{Kinematics, MovementFlags, Pose, Vec2, Vec3, integrate};

/// Height of a player's head above the floor.
pub const EYE_HEIGHT: f64 = 6.0;

/// Radius used for player-versus-world collision.
pub const COLLISION_DISTANCE: f64 = 4.5;

/// Flashlight intensity when switched on.
pub const MAX_FLASHLIGHT_INTENSITY: f64 = 40.0;

/// One player in a running game.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    kinematics: Kinematics,
    flags: MovementFlags,
    flashlight_on: bool,
}

impl Player {
    /// Creates a standing player at `(x, y)` facing `angle` radians
    /// counter-clockwise from +y.
    pub fn new(x: f64, y: f64, angle: f64) -> Self {
        Self {
            kinematics: Kinematics::new(Vec3::new(x, y, EYE_HEIGHT), angle),
            flags: MovementFlags::NONE,
            flashlight_on: false,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.kinematics.position
    }

    pub fn rotation_z(&self) -> f64 {
        self.kinematics.rotation_z
    }

    /// The intent vector used on the last update.
    pub fn direction(&self) -> Vec2 {
        self.kinematics.direction
    }

    pub fn animation_step(&self) -> f64 {
        self.kinematics.animation_step
    }

    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    pub fn movement_flags(&self) -> MovementFlags {
        self.flags
    }

    /// Replaces the held movement keys. Takes effect on the next update.
    pub fn set_movement_flags(&mut self, flags: MovementFlags) {
        self.flags = flags;
    }

    pub fn flashlight_on(&self) -> bool {
        self.flashlight_on
    }

    pub fn set_flashlight_on(&mut self, on: bool) {
        self.flashlight_on = on;
    }

    pub fn flashlight_intensity(&self) -> f64 {
        if self.flashlight_on {
            MAX_FLASHLIGHT_INTENSITY
        } else {
            0.0
        }
    }

    pub fn collision_distance(&self) -> f64 {
        COLLISION_DISTANCE
    }

    /// Advances the player by `dt` seconds using the current flags.
    pub fn update(&mut self, dt: f64) {
        self.kinematics = integrate(&self.kinematics, self.flags, dt);
    }

    /// Limb offsets for the current walk-cycle phase.
    pub fn pose(&self) -> Pose {
        Pose::at(self.kinematics.animation_step)
    }

    /// The externally visible state, as broadcast to clients.
    pub fn state(&self) -> PlayerState {
        PlayerState {
            position: self.kinematics.position,
            rotation_z: self.kinematics.rotation_z,
            animation_step: self.kinematics.animation_step,
            flashlight_on: self.flashlight_on,
        }
    }
}

/// Serializable snapshot of a player, enough for a client to place and
/// animate it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub position: Vec3,
    pub rotation_z: f64,
    pub animation_step: f64,
    pub flashlight_on: bool,
}
