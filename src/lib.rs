//! # `raycast_platformer_controller`
//!
//! A raycast-based kinematic character controller for 2D platformers.
//!
//! Instead of letting the physics engine move the character, the
//! controller integrates gravity itself, fans rays out to the side of
//! motion, below and above its box collider every fixed step, clamps the
//! pending displacement against the hits and writes the transform
//! directly. This yields the classic tight platformer feel:
//! - walkable slopes up to a configurable angle, with a speed curve
//! - one-way platforms that only collide from above
//! - moving platforms the character rides and is carried by
//! - timed collision suppression for dropping through platforms
//! - physics volumes that override parameters while overlapped
//!
//! ## Architecture
//!
//! The solver is pure: it sees the world only through the
//! [`probe::PhysicsProbe`] trait, which a physics backend implements over
//! its query pipeline. The [`PlatformerControllerPlugin`] is generic over
//! a [`PlatformerPhysicsBackend`] whose plugin registers the step-driving
//! system; a `bevy_rapier2d` backend ships behind the `rapier2d` feature.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_rapier2d::prelude::*;
//! use raycast_platformer_controller::prelude::*;
//!
//! App::new()
//!     .add_plugins(MinimalPlugins)
//!     .add_plugins(TransformPlugin)
//!     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
//!     .add_plugins(PlatformerControllerPlugin::<RapierBackend>::default())
//!     .run();
//! ```

use bevy::prelude::*;

pub mod collision;
pub mod config;
pub mod controller;
pub mod events;
pub mod mask;
pub mod probe;
pub mod solver;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier2d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::collision::{ColliderShape, RayHit};
    pub use crate::config::{
        ControllerParameters, DetachmentMethod, RaycastConfig, SlopeSpeedCurve,
    };
    pub use crate::controller::PlatformerController;
    pub use crate::events::{ControllerHitEvent, OverlapKind, PhysicsVolume, VolumeOverlapEvent};
    pub use crate::mask::{CollisionMask, PlatformLayers};
    pub use crate::probe::PhysicsProbe;
    pub use crate::state::{Airborne, ControllerState, Grounded, TouchingCeiling, TouchingWall};
    pub use crate::{PlatformerControllerPlugin, PlatformerPhysicsBackend, PlatformerSystems};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::{
        MovingPlatform, PlatformBundle, PlatformLayer, RapierBackend, RapierPlatformerBundle,
        SurfaceFriction,
    };
}

/// A physics backend for the controller.
///
/// The backend's plugin registers the step-driving system in
/// [`PlatformerSystems::Step`], implementing [`probe::PhysicsProbe`] over
/// its engine's query pipeline, and is responsible for emitting
/// [`events::ControllerHitEvent`] and [`events::VolumeOverlapEvent`].
pub trait PlatformerPhysicsBackend: Send + Sync + 'static {
    /// The plugin registering this backend's systems.
    fn plugin() -> impl Plugin;
}

/// Execution phases of one fixed step, chained in this order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformerSystems {
    /// Collision suppression timers advance and expire.
    Timers,
    /// Backends translate engine overlap events into volume events.
    VolumeEvents,
    /// Volume parameter overrides are applied and cleared.
    Overrides,
    /// The backend steps every controller.
    Step,
    /// Reactions to contacts, such as pushing dynamic bodies.
    Interactions,
    /// State marker components are synced from controller state.
    Markers,
}

/// Main plugin for the platformer controller.
///
/// Generic over a physics backend `B` providing ray probing and surface
/// lookups.
///
/// # Examples
///
/// With the Rapier2D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use raycast_platformer_controller::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(TransformPlugin)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(PlatformerControllerPlugin::<RapierBackend>::default())
///     .run();
/// ```
pub struct PlatformerControllerPlugin<B: PlatformerPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: PlatformerPhysicsBackend> Default for PlatformerControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: PlatformerPhysicsBackend> Plugin for PlatformerControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::ControllerParameters>();
        app.register_type::<config::SlopeSpeedCurve>();
        app.register_type::<config::RaycastConfig>();
        app.register_type::<config::DetachmentMethod>();
        app.register_type::<collision::ColliderShape>();
        app.register_type::<mask::PlatformLayers>();
        app.register_type::<state::ControllerState>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::TouchingWall>();
        app.register_type::<state::TouchingCeiling>();
        app.register_type::<events::PhysicsVolume>();

        app.add_event::<events::ControllerHitEvent>();
        app.add_event::<events::VolumeOverlapEvent>();

        app.configure_sets(
            FixedUpdate,
            (
                PlatformerSystems::Timers,
                PlatformerSystems::VolumeEvents,
                PlatformerSystems::Overrides,
                PlatformerSystems::Step,
                PlatformerSystems::Interactions,
                PlatformerSystems::Markers,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                systems::advance_suppression_timers.in_set(PlatformerSystems::Timers),
                systems::apply_volume_overrides.in_set(PlatformerSystems::Overrides),
                systems::sync_state_markers.in_set(PlatformerSystems::Markers),
            ),
        );
    }
}
