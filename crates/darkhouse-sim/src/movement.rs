//! The movement integrator: advances a player's kinematic state by one tick.
//!
//! Everything in this module is a pure function of its inputs. The server
//! runs it to produce authoritative positions and the presentation layer runs
//! the same code between snapshots, so both sides land on the same numbers
//! for the same sequence of `dt` values.
//!
//! Angles are radians measured counter-clockwise from the +y axis, so a
//! player facing "up" has `rotation_z == 0` and one facing right has
//! `rotation_z == -π/2`.

use std::f64::consts::{PI, SQRT_2, TAU};

use serde::{Deserialize, Serialize};

/// Speed along a single axis, in units per second.
pub const MOVE_SPEED_AXIAL: f64 = 30.0;

/// Per-axis speed while moving diagonally. Total speed stays at
/// [`MOVE_SPEED_AXIAL`].
pub const MOVE_SPEED_DIAGONAL: f64 = MOVE_SPEED_AXIAL / SQRT_2;

/// Turning speed, in radians per second.
pub const ROTATE_SPEED: f64 = PI * 1.5;

/// Animation phase advance per second of movement.
pub const ANIMATION_STEP_SPEED: f64 = 10.0;

// ---------------------------------------------------------------------------
// Vectors
// ---------------------------------------------------------------------------

/// A 2D intent vector. Each component is -1, 0 or 1 when derived from
/// [`MovementFlags`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// A point in world space. `z` is height and is never touched by the
/// integrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The four movement keys a player can hold down.
///
/// Set by the input device layer; the integrator turns them into a
/// [`Vec2`] every tick.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct MovementFlags {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub down: bool,
}

impl MovementFlags {
    /// No keys held.
    pub const NONE: Self = Self {
        left: false,
        up: false,
        right: false,
        down: false,
    };

    /// Derives the intent vector.
    ///
    /// Flags are applied in the order left, up, right, down, each one
    /// overwriting its axis. Holding both left and right therefore moves
    /// right, and holding both up and down moves down.
    pub fn direction(self) -> Vec2 {
        let mut direction = Vec2::ZERO;
        if self.left {
            direction.x = -1.0;
        }
        if self.up {
            direction.y = 1.0;
        }
        if self.right {
            direction.x = 1.0;
        }
        if self.down {
            direction.y = -1.0;
        }
        direction
    }
}

// ---------------------------------------------------------------------------
// Kinematic state
// ---------------------------------------------------------------------------

/// Everything the integrator reads and writes for one player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec3,
    /// Facing angle. Unbounded, but only meaningful modulo 2π.
    pub rotation_z: f64,
    /// The intent vector integrated on the last tick.
    pub direction: Vec2,
    /// Walk-cycle phase. Only grows.
    pub animation_step: f64,
}

impl Kinematics {
    pub fn new(position: Vec3, rotation_z: f64) -> Self {
        Self {
            position,
            rotation_z,
            direction: Vec2::ZERO,
            animation_step: 0.0,
        }
    }
}

/// Advances `state` by `dt` seconds under the given movement flags.
///
/// The direction is recomputed from `flags` first. With no intent the
/// player stands still: position, facing and animation phase are returned
/// unchanged. Otherwise the player turns toward the intent, moves along it
/// and advances the walk cycle.
///
/// `dt` is expected to be non-negative and reasonably small; callers clamp
/// it after long pauses.
pub fn integrate(state: &Kinematics, flags: MovementFlags, dt: f64) -> Kinematics {
    let direction = flags.direction();
    let mut next = Kinematics {
        direction,
        ..*state
    };

    if direction.is_zero() {
        return next;
    }

    next.rotation_z =
        rotate_toward(state.rotation_z, facing_angle(direction), dt);

    // Each axis goes diagonal-speed only when the other axis is also moving.
    let speed_x = if direction.y == 0.0 {
        MOVE_SPEED_AXIAL
    } else {
        MOVE_SPEED_DIAGONAL
    };
    let speed_y = if direction.x == 0.0 {
        MOVE_SPEED_AXIAL
    } else {
        MOVE_SPEED_DIAGONAL
    };
    next.position.x += direction.x * dt * speed_x;
    next.position.y += direction.y * dt * speed_y;
    next.animation_step += ANIMATION_STEP_SPEED * dt;

    next
}

/// The angle a player faces when moving along `direction`.
pub fn facing_angle(direction: Vec2) -> f64 {
    -direction.x.atan2(direction.y)
}

/// Turns `current` toward `target` by at most `ROTATE_SPEED * dt`.
///
/// If the raw difference is more than half a turn, `current` is first
/// shifted by a full turn so the rotation takes the short way round. The
/// result never overshoots `target`.
pub fn rotate_toward(current: f64, target: f64, dt: f64) -> f64 {
    let mut current = current;
    let mut difference = target - current;

    if difference.abs() > PI {
        if difference > 0.0 {
            current += TAU;
        } else {
            current -= TAU;
        }
        difference = target - current;
    }

    if difference == 0.0 {
        return current;
    }

    let step = ROTATE_SPEED * dt * difference.signum();
    if step.abs() > difference.abs() {
        current + difference
    } else {
        current + step
    }
}
