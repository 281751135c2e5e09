//! Controller configuration types.
//!
//! [`ControllerParameters`] is the physics tuning set; a character carries
//! a default instance and may receive a temporary override from a
//! [`crate::events::PhysicsVolume`]. [`RaycastConfig`] shapes the probe
//! fan-out and is not overridable.

use bevy::prelude::*;

/// Physics parameters for a platformer controller.
///
/// Either the character's defaults or a volume-supplied override; the
/// controller always resolves "override if present, else default".
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct ControllerParameters {
    /// Gravity applied to vertical speed, in units per second squared.
    /// Negative values pull downward.
    pub gravity: f32,
    /// Divides gravity while the character is moving up. Values above 1.0
    /// make the ascent floatier.
    pub ascent_multiplier: f32,
    /// Multiplies gravity while the character is moving down. Values above
    /// 1.0 make the fall snappier.
    pub fall_multiplier: f32,
    /// Per-axis clamp applied to the recomputed speed, except while riding
    /// a moving platform.
    pub max_velocity: Vec2,
    /// Curve mapping the signed below-slope angle (degrees) to a horizontal
    /// speed multiplier while grounded.
    pub slope_angle_speed_factor: SlopeSpeedCurve,
    /// Steepest surface angle (degrees, inclusive) the character can stand
    /// on. Anything steeper is treated as a wall by the side probe.
    pub maximum_slope_angle: f32,
    /// Whether side contacts push dynamic bodies.
    pub physics_interaction: bool,
    /// Velocity magnitude given to pushed bodies.
    pub push_force: f32,
}

impl Default for ControllerParameters {
    fn default() -> Self {
        Self {
            gravity: -25.0,
            ascent_multiplier: 1.0,
            fall_multiplier: 1.0,
            max_velocity: Vec2::new(100.0, 100.0),
            slope_angle_speed_factor: SlopeSpeedCurve::default(),
            maximum_slope_angle: 30.0,
            physics_interaction: true,
            push_force: 2.0,
        }
    }
}

impl ControllerParameters {
    /// Builder: set gravity.
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: set the ascent and fall gravity multipliers.
    pub fn with_gravity_multipliers(mut self, ascent: f32, fall: f32) -> Self {
        self.ascent_multiplier = ascent;
        self.fall_multiplier = fall;
        self
    }

    /// Builder: set the per-axis velocity clamp.
    pub fn with_max_velocity(mut self, max_velocity: Vec2) -> Self {
        self.max_velocity = max_velocity;
        self
    }

    /// Builder: set the walkable slope limit in degrees.
    pub fn with_maximum_slope_angle(mut self, degrees: f32) -> Self {
        self.maximum_slope_angle = degrees;
        self
    }

    /// Builder: set the slope angle speed curve.
    pub fn with_slope_speed_curve(mut self, curve: SlopeSpeedCurve) -> Self {
        self.slope_angle_speed_factor = curve;
        self
    }

    /// Builder: enable or disable pushing dynamic bodies on contact.
    pub fn with_physics_interaction(mut self, enabled: bool, push_force: f32) -> Self {
        self.physics_interaction = enabled;
        self.push_force = push_force;
        self
    }
}

/// A piecewise-linear curve mapping slope angle (degrees) to a horizontal
/// speed multiplier.
///
/// The sign convention matches the solver: the angle is negated while the
/// character descends, so a curve can slow climbs and speed up descents
/// independently. Evaluation clamps to the first/last key outside the
/// keyed range.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct SlopeSpeedCurve {
    keys: Vec<Vec2>,
}

impl Default for SlopeSpeedCurve {
    fn default() -> Self {
        Self::constant(1.0)
    }
}

impl SlopeSpeedCurve {
    /// A curve that returns `factor` for every angle.
    pub fn constant(factor: f32) -> Self {
        Self {
            keys: vec![Vec2::new(0.0, factor)],
        }
    }

    /// Build a curve from `(angle_degrees, factor)` keys.
    ///
    /// Keys are sorted by angle; an empty list degenerates to the identity
    /// curve.
    pub fn from_keys(keys: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut keys: Vec<Vec2> = keys.into_iter().map(|(a, f)| Vec2::new(a, f)).collect();
        if keys.is_empty() {
            return Self::default();
        }
        keys.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self { keys }
    }

    /// Evaluate the curve at a signed slope angle in degrees.
    pub fn evaluate(&self, angle: f32) -> f32 {
        match self.keys.len() {
            0 => 1.0,
            1 => self.keys[0].y,
            _ => {
                if angle <= self.keys[0].x {
                    return self.keys[0].y;
                }
                if angle >= self.keys[self.keys.len() - 1].x {
                    return self.keys[self.keys.len() - 1].y;
                }
                for pair in self.keys.windows(2) {
                    let (a, b) = (pair[0], pair[1]);
                    if angle <= b.x {
                        let t = if b.x > a.x { (angle - a.x) / (b.x - a.x) } else { 0.0 };
                        return a.y + (b.y - a.y) * t;
                    }
                }
                self.keys[self.keys.len() - 1].y
            }
        }
    }
}

/// How the character detaches from one-way and moving platforms when
/// dropping through them.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetachmentMethod {
    /// Suppress the relevant platform layers for the duration.
    #[default]
    Layer,
    /// Ignore only the specific collider being stood on.
    Object,
}

/// Ray fan-out configuration.
///
/// Ray counts should be dense enough that no obstacle can slip between two
/// adjacent rays.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct RaycastConfig {
    /// Number of rays cast to the side of motion, bottom to top.
    pub horizontal_ray_count: usize,
    /// Number of rays cast below and above, left to right.
    pub vertical_ray_count: usize,
    /// Skin offset added to ray lengths and position clamps to avoid
    /// numerical sticking at exact contact.
    pub ray_offset: f32,
    /// Stick to slopes when walking down them, suppressing bounce.
    pub stick_when_walking_down_slopes: bool,
    /// Length of the slope-stick ray; 0 derives it from the bounds and the
    /// walkable slope limit.
    pub sticky_raycast_length: f32,
    /// How drop-through detachment is performed.
    pub detachment_method: DetachmentMethod,
}

impl Default for RaycastConfig {
    fn default() -> Self {
        Self {
            horizontal_ray_count: 8,
            vertical_ray_count: 8,
            ray_offset: 0.05,
            stick_when_walking_down_slopes: false,
            sticky_raycast_length: 0.0,
            detachment_method: DetachmentMethod::Layer,
        }
    }
}

impl RaycastConfig {
    /// Builder: set both ray counts.
    pub fn with_ray_counts(mut self, horizontal: usize, vertical: usize) -> Self {
        self.horizontal_ray_count = horizontal.max(2);
        self.vertical_ray_count = vertical.max(2);
        self
    }

    /// Builder: set the skin offset.
    pub fn with_ray_offset(mut self, offset: f32) -> Self {
        self.ray_offset = offset;
        self
    }

    /// Builder: enable slope stickiness.
    pub fn with_slope_stick(mut self, enabled: bool) -> Self {
        self.stick_when_walking_down_slopes = enabled;
        self
    }

    /// Builder: set the detachment method.
    pub fn with_detachment_method(mut self, method: DetachmentMethod) -> Self {
        self.detachment_method = method;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_curve_is_identity() {
        let curve = SlopeSpeedCurve::default();
        assert_eq!(curve.evaluate(-45.0), 1.0);
        assert_eq!(curve.evaluate(0.0), 1.0);
        assert_eq!(curve.evaluate(45.0), 1.0);
    }

    #[test]
    fn curve_interpolates_between_keys() {
        let curve = SlopeSpeedCurve::from_keys([(0.0, 1.0), (30.0, 0.5)]);
        assert_relative_eq!(curve.evaluate(15.0), 0.75);
    }

    #[test]
    fn curve_clamps_outside_keyed_range() {
        let curve = SlopeSpeedCurve::from_keys([(-30.0, 1.5), (30.0, 0.5)]);
        assert_eq!(curve.evaluate(-90.0), 1.5);
        assert_eq!(curve.evaluate(90.0), 0.5);
    }

    #[test]
    fn curve_sorts_unordered_keys() {
        let curve = SlopeSpeedCurve::from_keys([(30.0, 0.5), (0.0, 1.0)]);
        assert_relative_eq!(curve.evaluate(15.0), 0.75);
    }

    #[test]
    fn parameter_builders() {
        let params = ControllerParameters::default()
            .with_gravity(-20.0)
            .with_gravity_multipliers(2.0, 3.0)
            .with_maximum_slope_angle(45.0);
        assert_eq!(params.gravity, -20.0);
        assert_eq!(params.ascent_multiplier, 2.0);
        assert_eq!(params.fall_multiplier, 3.0);
        assert_eq!(params.maximum_slope_angle, 45.0);
    }

    #[test]
    fn ray_counts_floor_at_two() {
        let config = RaycastConfig::default().with_ray_counts(1, 0);
        assert_eq!(config.horizontal_ray_count, 2);
        assert_eq!(config.vertical_ray_count, 2);
    }
}
