//! Probe result and bounding geometry types.

use bevy::prelude::*;

use crate::mask::CollisionMask;

/// Information about a single ray probe hit.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// World position of the hit point.
    pub point: Vec2,
    /// Normal of the surface at the hit point.
    pub normal: Vec2,
    /// The collider that was hit.
    pub collider: Entity,
    /// Layer classification of the hit collider.
    pub layers: CollisionMask,
}

impl RayHit {
    /// Create a hit result.
    pub fn new(
        distance: f32,
        point: Vec2,
        normal: Vec2,
        collider: Entity,
        layers: CollisionMask,
    ) -> Self {
        Self {
            distance,
            point,
            normal,
            collider,
            layers,
        }
    }
}

/// The box collider attached to a character, described as a size and an
/// offset from the entity's translation.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ColliderShape {
    /// Full extents of the box.
    pub size: Vec2,
    /// Offset of the box center from the entity translation.
    pub offset: Vec2,
}

impl ColliderShape {
    /// Create a collider shape centered on the entity.
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            offset: Vec2::ZERO,
        }
    }

    /// Create a collider shape with an explicit offset.
    pub fn with_offset(size: Vec2, offset: Vec2) -> Self {
        Self { size, offset }
    }

    /// World-space bounds of this collider for an entity at `position`.
    pub fn bounds_at(&self, position: Vec2) -> Bounds {
        let center = position + self.offset;
        Bounds {
            min: center - self.size / 2.0,
            max: center + self.size / 2.0,
        }
    }
}

/// Axis-aligned rectangle the ray origins are derived from.
///
/// Recomputed every step from the current transform and collider shape;
/// never persisted across steps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    /// Bottom-left corner.
    pub min: Vec2,
    /// Top-right corner.
    pub max: Vec2,
}

impl Bounds {
    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Center of the bottom edge.
    #[inline]
    pub fn bottom_center(&self) -> Vec2 {
        Vec2::new(self.center().x, self.min.y)
    }

    /// Center of the top edge.
    #[inline]
    pub fn top_center(&self) -> Vec2 {
        Vec2::new(self.center().x, self.max.y)
    }
}

/// Linear interpolation between two points, used to fan rays across a face
/// of the bounds.
#[inline]
pub(crate) fn lerp_point(from: Vec2, to: Vec2, t: f32) -> Vec2 {
    from + (to - from) * t
}
