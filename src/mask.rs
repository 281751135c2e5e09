//! Platform layer classifications and collision masks.
//!
//! The controller distinguishes four kinds of walkable geometry: regular
//! platforms, moving platforms, one-way platforms and moving one-way
//! platforms. Each lives on its own layer; the working mask used for
//! probing is the union of all four, and is temporarily narrowed by the
//! collision-suppression operations.

use bevy::prelude::*;
use bitflags::bitflags;

bitflags! {
    /// A bit-set layer classification for probe filtering.
    ///
    /// Layout is user-defined; the controller only cares about which bits
    /// its four platform layers occupy. The named constants below match
    /// the conventional layer assignment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CollisionMask: u32 {
        /// Regular, solid platforms.
        const PLATFORM = 1 << 0;
        /// Platforms that carry a path-motion component.
        const MOVING_PLATFORM = 1 << 1;
        /// Platforms that only collide when approached from above.
        const ONE_WAY_PLATFORM = 1 << 2;
        /// Moving platforms that only collide when approached from above.
        const MOVING_ONE_WAY_PLATFORM = 1 << 3;
    }
}

impl CollisionMask {
    /// Whether this mask shares at least one bit with `other`.
    #[inline]
    pub fn overlaps(&self, other: CollisionMask) -> bool {
        self.intersects(other)
    }
}

/// The four independent platform layer masks, the saved base mask, and the
/// working mask the probes actually use.
///
/// Invariant: `platform_mask_save` holds the plain-platform mask exactly as
/// configured; the one-way and moving additions are only ever unioned into
/// the working `platform_mask`, never into the save.
#[derive(Reflect, Debug, Clone, PartialEq, Eq)]
pub struct PlatformLayers {
    /// Working mask consumed by the probes. Mutated by the suppression
    /// operations and restored from the other fields.
    #[reflect(ignore)]
    pub platform_mask: CollisionMask,
    /// Layers holding moving platforms.
    #[reflect(ignore)]
    pub moving_platform_mask: CollisionMask,
    /// Layers holding one-way platforms.
    #[reflect(ignore)]
    pub one_way_platform_mask: CollisionMask,
    /// Layers holding moving one-way platforms.
    #[reflect(ignore)]
    pub moving_one_way_platform_mask: CollisionMask,
    /// The configured plain-platform mask, before any unions.
    #[reflect(ignore)]
    platform_mask_save: CollisionMask,
}

impl Default for PlatformLayers {
    fn default() -> Self {
        Self::new(
            CollisionMask::PLATFORM,
            CollisionMask::MOVING_PLATFORM,
            CollisionMask::ONE_WAY_PLATFORM,
            CollisionMask::MOVING_ONE_WAY_PLATFORM,
        )
    }
}

impl PlatformLayers {
    /// Build the layer set and derive the initial working mask.
    pub fn new(
        platform: CollisionMask,
        moving: CollisionMask,
        one_way: CollisionMask,
        moving_one_way: CollisionMask,
    ) -> Self {
        let mut layers = Self {
            platform_mask: CollisionMask::empty(),
            moving_platform_mask: moving,
            one_way_platform_mask: one_way,
            moving_one_way_platform_mask: moving_one_way,
            platform_mask_save: platform,
        };
        layers.collisions_on();
        layers
    }

    /// The working mask with every one-way layer removed.
    ///
    /// Used by the upper side rays and the above probe, which must never
    /// treat walkable-only surfaces as obstacles.
    #[inline]
    pub fn without_one_way(&self) -> CollisionMask {
        self.platform_mask & !self.one_way_platform_mask & !self.moving_one_way_platform_mask
    }

    /// Whether `layers` belongs to a one-way classification (plain or
    /// moving).
    #[inline]
    pub fn is_one_way(&self, layers: CollisionMask) -> bool {
        layers.overlaps(self.one_way_platform_mask)
            || layers.overlaps(self.moving_one_way_platform_mask)
    }

    /// Restore the working mask to the full default union.
    pub fn collisions_on(&mut self) {
        self.platform_mask = self.platform_mask_save
            | self.one_way_platform_mask
            | self.moving_platform_mask
            | self.moving_one_way_platform_mask;
    }

    /// Empty the working mask entirely.
    pub fn collisions_off(&mut self) {
        self.platform_mask = CollisionMask::empty();
    }

    /// Remove the one-way layers (plain and moving) from the working mask.
    pub fn collisions_off_with_one_way(&mut self) {
        self.platform_mask &= !self.one_way_platform_mask;
        self.platform_mask &= !self.moving_one_way_platform_mask;
    }

    /// Remove the moving-platform layers (plain and one-way) from the
    /// working mask.
    pub fn collisions_off_with_moving_platforms(&mut self) {
        self.platform_mask &= !self.moving_platform_mask;
        self.platform_mask &= !self.moving_one_way_platform_mask;
    }
}
