//! Per-step collision state and the marker components derived from it.

use bevy::prelude::*;

/// Collision flags and slope angles for the most recent completed step.
///
/// Owned exclusively by the controller and reset at the start of every
/// step, after the `was_*_last_frame` snapshot is taken. The snapshot
/// fields therefore always describe the prior step's outcome.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerState {
    /// A wall on the right was hit this step.
    pub is_colliding_right: bool,
    /// A wall on the left was hit this step.
    pub is_colliding_left: bool,
    /// A ceiling was hit this step.
    pub is_colliding_above: bool,
    /// A walkable surface was found below this step.
    pub is_colliding_below: bool,
    /// The character is moving downward this step.
    pub is_falling: bool,
    /// The last side hit was at or below the walkable slope limit.
    pub slope_angle_ok: bool,
    /// `is_colliding_below` from the previous step.
    pub was_grounded_last_frame: bool,
    /// `is_colliding_above` from the previous step.
    pub was_touching_the_ceiling_last_frame: bool,
    /// The character became grounded this step after being airborne.
    pub just_got_grounded: bool,
    /// The character is riding a moving platform.
    pub on_a_moving_platform: bool,
    /// Angle (degrees) of the last surface hit by the side probe.
    pub lateral_slope_angle: f32,
    /// Signed angle (degrees) of the surface below; positive when the
    /// surface faces upward-left.
    pub below_slope_angle: f32,
}

impl ControllerState {
    /// Grounded means standing on something, or riding a moving platform.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.is_colliding_below || self.on_a_moving_platform
    }

    /// Any collision flag set this step.
    #[inline]
    pub fn has_collisions(&self) -> bool {
        self.is_colliding_right
            || self.is_colliding_left
            || self.is_colliding_above
            || self.is_colliding_below
    }

    /// Clear the per-step flags. The `was_*_last_frame` snapshots, the
    /// moving-platform flag and the below flag survive; the below probe
    /// owns `is_colliding_below` and rewrites it on every pass it runs.
    pub fn reset(&mut self) {
        self.is_colliding_left = false;
        self.is_colliding_right = false;
        self.is_colliding_above = false;
        self.is_falling = true;
        self.slope_angle_ok = false;
        self.just_got_grounded = false;
        self.lateral_slope_angle = 0.0;
    }
}

/// Marker component indicating the character is grounded.
///
/// Synced automatically from [`ControllerState::is_grounded`]. Mutually
/// exclusive with [`Airborne`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the character is pressed against a wall.
///
/// Added when a side probe hit exceeded the walkable slope limit.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct TouchingWall {
    /// Direction from the character to the wall.
    pub direction: Vec2,
}

impl Default for TouchingWall {
    fn default() -> Self {
        Self { direction: Vec2::X }
    }
}

impl TouchingWall {
    /// Create a wall touch state.
    pub fn new(direction: Vec2) -> Self {
        Self { direction }
    }

    /// Check if the wall is on the left side.
    pub fn is_left(&self) -> bool {
        self.direction.x < 0.0
    }

    /// Check if the wall is on the right side.
    pub fn is_right(&self) -> bool {
        self.direction.x > 0.0
    }
}

/// Marker component indicating the character hit a ceiling this step.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct TouchingCeiling;
