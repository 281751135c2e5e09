//! The platformer controller component.
//!
//! [`PlatformerController`] owns everything a character needs to be
//! stepped by the solver: collision state, parameters and their optional
//! volume override, layer masks, the external force accumulator, the
//! collider shape, and the moving-platform coupling. The solver in
//! [`crate::solver`] mutates it once per simulation step; everything else
//! goes through the mutators and queries below.

use bevy::log::warn;
use bevy::prelude::*;

use crate::collision::{Bounds, ColliderShape, RayHit};
use crate::config::{ControllerParameters, DetachmentMethod, RaycastConfig};
use crate::mask::PlatformLayers;
use crate::probe::PhysicsProbe;
use crate::solver::SMALL_VALUE;
use crate::state::ControllerState;

/// Which layers a timed suppression window removed, so expiry knows what
/// to restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuppressionKind {
    All,
    OneWay,
    MovingPlatforms,
    IgnoredCollider,
}

/// A pending mask restoration, advanced by the step driver.
#[derive(Debug, Clone)]
struct CollisionSuppression {
    kind: SuppressionKind,
    remaining: f32,
}

/// Raycast-based kinematic character controller for 2D platformers.
///
/// Attach to an entity with a `Transform`. The controller replaces
/// engine rigidbody physics with hand-rolled gravity integration and
/// multi-ray collision resolution against the configured platform layers.
#[derive(Component, Debug, Clone)]
pub struct PlatformerController {
    /// Default physics parameters.
    pub parameters: ControllerParameters,
    /// Ray fan-out configuration.
    pub raycast: RaycastConfig,
    /// Platform layer classification and the working probe mask.
    pub layers: PlatformLayers,

    override_parameters: Option<ControllerParameters>,

    pub(crate) state: ControllerState,
    pub(crate) speed: Vec2,
    pub(crate) external_force: Vec2,
    pub(crate) forces_applied: Vec2,
    /// Displacement being resolved for the current step.
    pub(crate) new_position: Vec2,
    pub(crate) bounds: Bounds,
    pub(crate) contacts: Vec<RayHit>,

    collider: ColliderShape,
    original_collider: ColliderShape,

    pub(crate) friction: f32,
    pub(crate) fall_slow_factor: f32,
    pub(crate) gravity_active: bool,
    pub(crate) current_gravity: f32,

    pub(crate) moving_platform: Option<Entity>,
    pub(crate) moving_platform_velocity: Vec2,
    pub(crate) moving_platform_gravity: f32,

    pub(crate) standing_on: Option<Entity>,
    pub(crate) current_wall: Option<Entity>,
    pub(crate) ignored_collider: Option<Entity>,

    suppression: Option<CollisionSuppression>,
}

impl PlatformerController {
    /// Create a controller for the given box collider.
    ///
    /// A horizontally off-center collider causes asymmetric wall pushback
    /// when turning around near walls; it is tolerated but flagged once.
    pub fn new(collider: ColliderShape) -> Self {
        if collider.offset.x != 0.0 {
            warn!(
                "controller collider has a non-zero x offset ({}); this may cause \
                 issues when changing direction close to a wall",
                collider.offset.x
            );
        }

        let mut state = ControllerState::default();
        state.reset();

        Self {
            parameters: ControllerParameters::default(),
            raycast: RaycastConfig::default(),
            layers: PlatformLayers::default(),
            override_parameters: None,
            state,
            speed: Vec2::ZERO,
            external_force: Vec2::ZERO,
            forces_applied: Vec2::ZERO,
            new_position: Vec2::ZERO,
            bounds: Bounds::default(),
            contacts: Vec::with_capacity(8),
            collider,
            original_collider: collider,
            friction: 0.0,
            fall_slow_factor: 0.0,
            gravity_active: true,
            current_gravity: 0.0,
            moving_platform: None,
            moving_platform_velocity: Vec2::ZERO,
            moving_platform_gravity: 0.0,
            standing_on: None,
            current_wall: None,
            ignored_collider: None,
            suppression: None,
        }
    }

    /// Builder: set the default parameters.
    pub fn with_parameters(mut self, parameters: ControllerParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Builder: set the raycast configuration.
    pub fn with_raycast_config(mut self, raycast: RaycastConfig) -> Self {
        self.raycast = raycast;
        self
    }

    /// Builder: set the platform layer classification.
    pub fn with_layers(mut self, layers: PlatformLayers) -> Self {
        self.layers = layers;
        self
    }

    // === Parameter override (volume) resolution ===

    /// The parameters in effect: the override if present, else the
    /// defaults.
    #[inline]
    pub fn effective_parameters(&self) -> &ControllerParameters {
        self.override_parameters.as_ref().unwrap_or(&self.parameters)
    }

    /// Install a volume-supplied parameter override. Last writer wins; no
    /// stacking.
    pub fn apply_override(&mut self, parameters: ControllerParameters) {
        self.override_parameters = Some(parameters);
    }

    /// Drop any active parameter override.
    pub fn clear_override(&mut self) {
        self.override_parameters = None;
    }

    /// Whether a volume override is currently active.
    pub fn has_override(&self) -> bool {
        self.override_parameters.is_some()
    }

    // === Force mutators ===

    /// Add a force to the character.
    pub fn add_force(&mut self, force: Vec2) {
        self.speed += force;
        self.external_force += force;
    }

    /// Add a horizontal force to the character.
    pub fn add_horizontal_force(&mut self, x: f32) {
        self.speed.x += x;
        self.external_force.x += x;
    }

    /// Add a vertical force to the character.
    pub fn add_vertical_force(&mut self, y: f32) {
        self.speed.y += y;
        self.external_force.y += y;
    }

    /// Replace the character's velocity and external force outright.
    pub fn set_force(&mut self, force: Vec2) {
        self.speed = force;
        self.external_force = force;
    }

    /// Replace the horizontal velocity and external force.
    pub fn set_horizontal_force(&mut self, x: f32) {
        self.speed.x = x;
        self.external_force.x = x;
    }

    /// Replace the vertical velocity and external force.
    pub fn set_vertical_force(&mut self, y: f32) {
        self.speed.y = y;
        self.external_force.y = y;
    }

    // === Gravity and fall shaping ===

    /// Enable or disable gravity for this character only.
    pub fn set_gravity_active(&mut self, active: bool) {
        self.gravity_active = active;
    }

    /// Slow the character's fall by the given factor; 0 disables the
    /// effect.
    pub fn slow_fall(&mut self, factor: f32) {
        self.fall_slow_factor = factor;
    }

    // === Moving platform ===

    /// Disconnect from the current moving platform, restoring gravity.
    pub fn detach_from_moving_platform(&mut self) {
        self.gravity_active = true;
        self.state.on_a_moving_platform = false;
        self.moving_platform = None;
        self.moving_platform_velocity = Vec2::ZERO;
        self.moving_platform_gravity = 0.0;
    }

    pub(crate) fn attach_to_moving_platform(&mut self, platform: Entity) {
        self.moving_platform = Some(platform);
    }

    // === Collision suppression ===

    /// Set (or clear) the one collider the probes should pass through.
    pub fn set_ignored_collider(&mut self, collider: Option<Entity>) {
        self.ignored_collider = collider;
    }

    /// Restore the working mask to the full platform union.
    pub fn collisions_on(&mut self) {
        self.layers.collisions_on();
    }

    /// Turn all collision probing off.
    pub fn collisions_off(&mut self) {
        self.layers.collisions_off();
    }

    /// Disable all collision probing for `duration` seconds, then restore
    /// the prior mask. A new request replaces any pending window.
    pub fn disable_collisions(&mut self, duration: f32) {
        self.layers.collisions_off();
        self.suppression = Some(CollisionSuppression {
            kind: SuppressionKind::All,
            remaining: duration,
        });
    }

    /// Disable one-way platform collisions for `duration` seconds.
    ///
    /// With [`DetachmentMethod::Layer`] the one-way layers are removed
    /// from the working mask; with [`DetachmentMethod::Object`] only the
    /// collider currently stood on is ignored.
    pub fn disable_one_way_collisions(&mut self, duration: f32) {
        match self.raycast.detachment_method {
            DetachmentMethod::Layer => {
                self.layers.collisions_off_with_one_way();
                self.suppression = Some(CollisionSuppression {
                    kind: SuppressionKind::OneWay,
                    remaining: duration,
                });
            }
            DetachmentMethod::Object => {
                self.ignored_collider = self.standing_on;
                self.suppression = Some(CollisionSuppression {
                    kind: SuppressionKind::IgnoredCollider,
                    remaining: duration,
                });
            }
        }
    }

    /// Disable moving-platform collisions for `duration` seconds, using
    /// the configured detachment method.
    pub fn disable_moving_platform_collisions(&mut self, duration: f32) {
        match self.raycast.detachment_method {
            DetachmentMethod::Layer => {
                self.layers.collisions_off_with_moving_platforms();
                self.suppression = Some(CollisionSuppression {
                    kind: SuppressionKind::MovingPlatforms,
                    remaining: duration,
                });
            }
            DetachmentMethod::Object => {
                self.ignored_collider = self.standing_on;
                self.suppression = Some(CollisionSuppression {
                    kind: SuppressionKind::IgnoredCollider,
                    remaining: duration,
                });
            }
        }
    }

    /// Cancel a pending suppression window, restoring collisions
    /// immediately.
    pub fn cancel_collision_suppression(&mut self) {
        if let Some(suppression) = self.suppression.take() {
            self.restore_after(suppression.kind);
        }
    }

    /// Advance the suppression timer by `dt`, restoring the mask when the
    /// window expires.
    pub(crate) fn advance_suppression(&mut self, dt: f32) {
        if let Some(suppression) = self.suppression.as_mut() {
            suppression.remaining -= dt;
            if suppression.remaining <= 0.0 {
                let kind = suppression.kind;
                self.suppression = None;
                self.restore_after(kind);
            }
        }
    }

    fn restore_after(&mut self, kind: SuppressionKind) {
        match kind {
            SuppressionKind::IgnoredCollider => self.ignored_collider = None,
            SuppressionKind::All | SuppressionKind::OneWay | SuppressionKind::MovingPlatforms => {
                self.layers.collisions_on();
            }
        }
    }

    // === Collider resizing ===

    /// Resize the collider, recentering the offset so the top edge stays
    /// fixed. Used for crouch transitions.
    pub fn resize_collider(&mut self, new_size: Vec2) {
        let new_y_offset =
            self.original_collider.offset.y + (self.original_collider.size.y - new_size.y) / 2.0;
        self.collider.size = new_size;
        self.collider.offset = Vec2::new(self.collider.offset.x, new_y_offset);
    }

    /// Return the collider to its original size and offset.
    pub fn reset_collider_size(&mut self) {
        self.collider = self.original_collider;
    }

    /// Whether the collider can be restored to its original size without
    /// clipping into geometry above.
    ///
    /// Fires two upward probes from the top corners, covering the height
    /// the collider would regain; either hit refuses the resize-back.
    pub fn can_go_back_to_original_size<P: PhysicsProbe>(&self, probe: &P) -> bool {
        if self.collider.size == self.original_collider.size {
            return true;
        }
        let head_check_distance =
            (self.original_collider.size.y - self.collider.size.y).max(0.0) + SMALL_VALUE;

        let left_origin = Vec2::new(self.bounds.min.x, self.bounds.max.y + SMALL_VALUE);
        let right_origin = Vec2::new(self.bounds.max.x, self.bounds.max.y + SMALL_VALUE);

        let mask = self.layers.platform_mask;
        probe
            .raycast(left_origin, Vec2::Y, head_check_distance, mask)
            .is_none()
            && probe
                .raycast(right_origin, Vec2::Y, head_check_distance, mask)
                .is_none()
    }

    // === Queries ===

    /// Current velocity of the character.
    #[inline]
    pub fn speed(&self) -> Vec2 {
        self.speed
    }

    /// The speed vector snapshotted before the probes ran, external
    /// forces included.
    #[inline]
    pub fn forces_applied(&self) -> Vec2 {
        self.forces_applied
    }

    /// Snapshot of the collision flags and slope angles for the most
    /// recent step.
    #[inline]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Grounded means standing on something or riding a moving platform.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.state.is_grounded()
    }

    /// Friction published by the surface currently stood on; 0 when none.
    #[inline]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// The collider currently stood on, if any.
    #[inline]
    pub fn standing_on(&self) -> Option<Entity> {
        self.standing_on
    }

    /// The wall collider hit by the side probe this step, if any.
    #[inline]
    pub fn current_wall(&self) -> Option<Entity> {
        self.current_wall
    }

    /// The moving platform currently ridden, if any.
    #[inline]
    pub fn moving_platform(&self) -> Option<Entity> {
        self.moving_platform
    }

    /// Current collider description.
    #[inline]
    pub fn collider_shape(&self) -> ColliderShape {
        self.collider
    }

    /// Bounds width as of the last step.
    #[inline]
    pub fn width(&self) -> f32 {
        self.bounds.width()
    }

    /// Bounds height as of the last step.
    #[inline]
    pub fn height(&self) -> f32 {
        self.bounds.height()
    }

    /// World position of the collider center as of the last step.
    #[inline]
    pub fn collider_center(&self) -> Vec2 {
        self.bounds.center()
    }

    /// World position of the bottom edge center as of the last step.
    #[inline]
    pub fn collider_bottom(&self) -> Vec2 {
        self.bounds.bottom_center()
    }

    /// Contact hits recorded this step (side-probe wall contacts).
    #[inline]
    pub fn contacts(&self) -> &[RayHit] {
        &self.contacts
    }

    /// Recompute the bounding rectangle from the current position.
    pub(crate) fn update_bounds(&mut self, position: Vec2) {
        self.bounds = self.collider.bounds_at(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::RayHit;
    use crate::mask::CollisionMask;

    fn controller() -> PlatformerController {
        PlatformerController::new(ColliderShape::new(Vec2::new(1.0, 2.0)))
    }

    struct NoHits;
    impl PhysicsProbe for NoHits {
        fn raycast(&self, _: Vec2, _: Vec2, _: f32, _: CollisionMask) -> Option<RayHit> {
            None
        }
        fn surface_friction(&self, _: Entity) -> Option<f32> {
            None
        }
        fn platform_velocity(&self, _: Entity) -> Option<Vec2> {
            None
        }
    }

    struct AlwaysHit;
    impl PhysicsProbe for AlwaysHit {
        fn raycast(&self, origin: Vec2, _: Vec2, _: f32, _: CollisionMask) -> Option<RayHit> {
            Some(RayHit::new(
                0.1,
                origin,
                Vec2::NEG_Y,
                Entity::from_raw(7),
                CollisionMask::PLATFORM,
            ))
        }
        fn surface_friction(&self, _: Entity) -> Option<f32> {
            None
        }
        fn platform_velocity(&self, _: Entity) -> Option<Vec2> {
            None
        }
    }

    #[test]
    fn override_resolution_is_override_else_default() {
        let mut controller = controller();
        assert_eq!(controller.effective_parameters().gravity, -25.0);

        controller.apply_override(ControllerParameters::default().with_gravity(-5.0));
        assert_eq!(controller.effective_parameters().gravity, -5.0);

        controller.clear_override();
        assert_eq!(controller.effective_parameters().gravity, -25.0);
    }

    #[test]
    fn override_last_writer_wins() {
        let mut controller = controller();
        controller.apply_override(ControllerParameters::default().with_gravity(-5.0));
        controller.apply_override(ControllerParameters::default().with_gravity(-9.0));
        assert_eq!(controller.effective_parameters().gravity, -9.0);
    }

    #[test]
    fn forces_accumulate_into_speed_and_external_force() {
        let mut controller = controller();
        controller.add_force(Vec2::new(1.0, 2.0));
        controller.add_horizontal_force(3.0);
        controller.add_vertical_force(-1.0);

        assert_eq!(controller.speed(), Vec2::new(4.0, 1.0));
        assert_eq!(controller.external_force, Vec2::new(4.0, 1.0));

        controller.set_force(Vec2::new(0.5, 0.5));
        assert_eq!(controller.speed(), Vec2::new(0.5, 0.5));
        assert_eq!(controller.external_force, Vec2::new(0.5, 0.5));
    }

    #[test]
    fn resize_keeps_top_edge_fixed() {
        let mut controller = controller();
        let original = controller.collider_shape();

        controller.resize_collider(Vec2::new(1.0, 1.0));
        let resized = controller.collider_shape();

        // Top edge: offset.y + size.y / 2 must be unchanged.
        assert_eq!(
            original.offset.y + original.size.y / 2.0,
            resized.offset.y + resized.size.y / 2.0
        );
        assert_eq!(resized.size, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn resize_round_trip_restores_exact_shape() {
        let mut controller = controller();
        let original = controller.collider_shape();

        controller.resize_collider(Vec2::new(0.8, 1.2));
        controller.reset_collider_size();

        assert_eq!(controller.collider_shape(), original);
    }

    #[test]
    fn can_stand_up_when_already_original_size() {
        let controller = controller();
        assert!(controller.can_go_back_to_original_size(&AlwaysHit));
    }

    #[test]
    fn stand_up_refused_when_blocked_above() {
        let mut controller = controller();
        controller.resize_collider(Vec2::new(1.0, 1.0));
        assert!(!controller.can_go_back_to_original_size(&AlwaysHit));
        assert!(controller.can_go_back_to_original_size(&NoHits));
    }

    #[test]
    fn suppression_timer_restores_mask_bit_for_bit() {
        let mut controller = controller();
        let before = controller.layers.platform_mask;

        controller.disable_collisions(0.5);
        assert!(controller.layers.platform_mask.is_empty());

        controller.advance_suppression(0.3);
        assert!(controller.layers.platform_mask.is_empty());

        controller.advance_suppression(0.3);
        assert_eq!(controller.layers.platform_mask, before);
    }

    #[test]
    fn suppression_cancel_restores_immediately() {
        let mut controller = controller();
        let before = controller.layers.platform_mask;

        controller.disable_one_way_collisions(10.0);
        assert_ne!(controller.layers.platform_mask, before);

        controller.cancel_collision_suppression();
        assert_eq!(controller.layers.platform_mask, before);
    }

    #[test]
    fn object_detachment_ignores_standing_collider() {
        let mut controller = controller();
        controller.raycast.detachment_method = DetachmentMethod::Object;
        controller.standing_on = Some(Entity::from_raw(3));
        let mask_before = controller.layers.platform_mask;

        controller.disable_one_way_collisions(0.2);
        assert_eq!(controller.ignored_collider, Some(Entity::from_raw(3)));
        // Object mode never touches the layer mask.
        assert_eq!(controller.layers.platform_mask, mask_before);

        controller.advance_suppression(0.25);
        assert_eq!(controller.ignored_collider, None);
    }

    #[test]
    fn detach_restores_gravity_and_clears_platform() {
        let mut controller = controller();
        controller.attach_to_moving_platform(Entity::from_raw(9));
        controller.state.on_a_moving_platform = true;
        controller.gravity_active = false;
        controller.moving_platform_gravity = -500.0;

        controller.detach_from_moving_platform();

        assert!(controller.gravity_active);
        assert!(!controller.state.on_a_moving_platform);
        assert_eq!(controller.moving_platform(), None);
        assert_eq!(controller.moving_platform_gravity, 0.0);
    }
}
