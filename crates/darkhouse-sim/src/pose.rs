//! Walk-cycle limb offsets derived from a player's animation phase.
//!
//! Presentation-only, but computed from `animation_step` alone so a replay
//! of the same phase always produces the same pose.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Swing amplitude of the feet along the facing axis.
pub const FOOT_AMPLITUDE: f64 = 2.0;

/// Swing amplitude of the hands along the facing axis.
pub const HAND_AMPLITUDE: f64 = 1.0;

/// Rest positions of the limbs relative to the head, in the player's local
/// frame (+y is forward).
pub const LEFT_HAND_REST: Vec3 = Vec3::new(-5.0, 0.0, -1.0);
pub const RIGHT_HAND_REST: Vec3 = Vec3::new(5.0, 0.0, -1.0);
pub const LEFT_FOOT_REST: Vec3 = Vec3::new(-2.5, 0.0, -6.0);
pub const RIGHT_FOOT_REST: Vec3 = Vec3::new(2.5, 0.0, -6.0);

/// Local positions of the four limbs at one point of the walk cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub left_foot: Vec3,
    pub right_foot: Vec3,
    pub left_hand: Vec3,
    pub right_hand: Vec3,
}

impl Pose {
    /// Computes the pose for a given animation phase.
    ///
    /// Each foot swings opposite its hand, and the right side runs a
    /// quarter turn out of phase with the left.
    pub fn at(step: f64) -> Self {
        let lead = step.sin();
        let trail = (step + FRAC_PI_2).cos();

        Self {
            left_foot: swing(LEFT_FOOT_REST, lead * FOOT_AMPLITUDE),
            right_foot: swing(RIGHT_FOOT_REST, trail * FOOT_AMPLITUDE),
            left_hand: swing(LEFT_HAND_REST, trail * HAND_AMPLITUDE),
            right_hand: swing(RIGHT_HAND_REST, lead * HAND_AMPLITUDE),
        }
    }

    /// The standing pose.
    pub fn rest() -> Self {
        Self::at(0.0)
    }
}

fn swing(rest: Vec3, y: f64) -> Vec3 {
    Vec3 { y, ..rest }
}
