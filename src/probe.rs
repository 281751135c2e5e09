//! The geometry contract the solver consumes.
//!
//! The solver never talks to a physics engine directly; it only needs a
//! ray probe and two capability lookups on hit colliders. Backends adapt
//! their engine's query pipeline to this trait, and tests implement it
//! with fixture geometry.

use bevy::prelude::*;

use crate::collision::RayHit;
use crate::mask::CollisionMask;

/// Ray probing and surface capability lookups for one solver step.
///
/// Implementations are expected to exclude the probing character's own
/// collider from results. The solver handles its ignored-collider filter
/// itself, so hits against the ignored collider must still be reported.
pub trait PhysicsProbe {
    /// Cast a ray and return the closest hit within `length`, restricted
    /// to colliders whose layers overlap `mask`.
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        length: f32,
        mask: CollisionMask,
    ) -> Option<RayHit>;

    /// Friction override published by the surface, if any.
    fn surface_friction(&self, collider: Entity) -> Option<f32>;

    /// Current velocity of the platform carrying `collider`, if the
    /// collider belongs to a moving platform.
    fn platform_velocity(&self, collider: Entity) -> Option<Vec2>;
}
