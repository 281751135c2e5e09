//! Rapier2D physics backend.
//!
//! Adapts the `bevy_rapier2d` query pipeline to the [`PhysicsProbe`]
//! contract, drives the solver step from a `FixedUpdate` system, and
//! translates rapier collision events into volume overlap events. Enable
//! with the `rapier2d` feature.
//!
//! The backend does not add `RapierPhysicsPlugin` itself; the application
//! owns the physics plugin and its configuration.

use bevy::prelude::*;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::prelude::*;

use crate::collision::RayHit;
use crate::controller::PlatformerController;
use crate::events::{ControllerHitEvent, OverlapKind, PhysicsVolume, VolumeOverlapEvent};
use crate::mask::CollisionMask;
use crate::probe::PhysicsProbe;
use crate::solver;
use crate::{PlatformerPhysicsBackend, PlatformerSystems};

/// Rapier2D backend for the platformer controller.
pub struct RapierBackend;

impl PlatformerPhysicsBackend for RapierBackend {
    fn plugin() -> impl Plugin {
        RapierBackendPlugin
    }
}

/// Plugin registering the rapier-specific systems.
pub struct RapierBackendPlugin;

impl Plugin for RapierBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<PlatformLayer>()
            .register_type::<MovingPlatform>()
            .register_type::<SurfaceFriction>();

        app.add_systems(
            FixedUpdate,
            (
                translate_volume_overlaps.in_set(PlatformerSystems::VolumeEvents),
                step_controllers.in_set(PlatformerSystems::Step),
                push_dynamic_bodies.in_set(PlatformerSystems::Interactions),
            ),
        );
    }
}

/// Layer classification for a walkable collider.
///
/// The collider's rapier [`CollisionGroups`] memberships must mirror these
/// bits so the probe filter can select layers; see
/// [`platform_collision_groups`].
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct PlatformLayer(#[reflect(ignore)] pub CollisionMask);

impl Default for PlatformLayer {
    fn default() -> Self {
        Self(CollisionMask::PLATFORM)
    }
}

/// Published velocity of a kinematic platform the controller can ride.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct MovingPlatform {
    /// Current velocity of the platform, in units per second.
    pub velocity: Vec2,
}

/// Friction override published by a surface, read when stood upon.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct SurfaceFriction(pub f32);

/// Collision groups for a platform collider on the given layers.
pub fn platform_collision_groups(mask: CollisionMask) -> CollisionGroups {
    CollisionGroups::new(Group::from_bits_truncate(mask.bits()), Group::ALL)
}

/// Probe adapter over the rapier query pipeline plus the component lookups
/// the solver needs on hit colliders.
struct RapierProbe<'a, 'w, 's> {
    context: &'a RapierContext<'a>,
    character: Entity,
    layers: &'a Query<'w, 's, &'static PlatformLayer>,
    frictions: &'a Query<'w, 's, &'static SurfaceFriction>,
    platforms: &'a Query<'w, 's, &'static MovingPlatform>,
}

impl PhysicsProbe for RapierProbe<'_, '_, '_> {
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        length: f32,
        mask: CollisionMask,
    ) -> Option<RayHit> {
        if mask.is_empty() {
            return None;
        }

        let filter = QueryFilter::default()
            .exclude_rigid_body(self.character)
            .exclude_sensors()
            .groups(CollisionGroups::new(
                Group::ALL,
                Group::from_bits_truncate(mask.bits()),
            ));

        let (collider, intersection) =
            self.context
                .cast_ray_and_get_normal(origin, direction, length, true, filter)?;

        let layers = self
            .layers
            .get(collider)
            .map(|layer| layer.0)
            .unwrap_or(CollisionMask::PLATFORM);

        Some(RayHit::new(
            intersection.time_of_impact,
            intersection.point,
            intersection.normal,
            collider,
            layers,
        ))
    }

    fn surface_friction(&self, collider: Entity) -> Option<f32> {
        self.frictions.get(collider).ok().map(|friction| friction.0)
    }

    fn platform_velocity(&self, collider: Entity) -> Option<Vec2> {
        self.platforms.get(collider).ok().map(|platform| platform.velocity)
    }
}

/// Step every controller against the rapier world.
fn step_controllers(
    rapier_context: ReadRapierContext,
    time: Res<Time>,
    mut controllers: Query<(Entity, &mut Transform, &mut PlatformerController)>,
    layers: Query<&'static PlatformLayer>,
    frictions: Query<&'static SurfaceFriction>,
    platforms: Query<&'static MovingPlatform>,
    mut hit_events: EventWriter<ControllerHitEvent>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };
    let dt = time.delta_secs();

    for (entity, mut transform, mut controller) in &mut controllers {
        let probe = RapierProbe {
            context: &context,
            character: entity,
            layers: &layers,
            frictions: &frictions,
            platforms: &platforms,
        };

        let mut position = transform.translation.truncate();
        // Snapshot before the step clears it, so the hit event carries the
        // force that was in effect during the contact.
        let external_force = controller.external_force;

        solver::step(&mut controller, &mut position, &probe, dt);

        transform.translation.x = position.x;
        transform.translation.y = position.y;

        if controller.state().has_collisions() {
            hit_events.write(ControllerHitEvent {
                entity,
                contacts: controller.contacts().to_vec(),
                external_force,
            });
        }
    }
}

/// Give dynamic bodies touched by the side probe a shove along the
/// direction of the applied force.
fn push_dynamic_bodies(
    mut hits: EventReader<ControllerHitEvent>,
    controllers: Query<&PlatformerController>,
    mut bodies: Query<(&RigidBody, &mut Velocity)>,
) {
    for hit in hits.read() {
        let Ok(controller) = controllers.get(hit.entity) else {
            continue;
        };
        let params = controller.effective_parameters();
        if !params.physics_interaction {
            continue;
        }

        let push = Vec2::new(hit.external_force.x, 0.0).normalize_or_zero() * params.push_force;
        if push == Vec2::ZERO {
            continue;
        }

        for contact in &hit.contacts {
            if let Ok((body, mut velocity)) = bodies.get_mut(contact.collider) {
                if *body == RigidBody::Dynamic {
                    velocity.linvel = push;
                }
            }
        }
    }
}

/// Turn rapier sensor collision events into volume overlap events.
fn translate_volume_overlaps(
    mut collisions: EventReader<CollisionEvent>,
    volumes: Query<(), With<PhysicsVolume>>,
    controllers: Query<(), With<PlatformerController>>,
    mut overlaps: EventWriter<VolumeOverlapEvent>,
) {
    for collision in collisions.read() {
        let (a, b, kind) = match collision {
            CollisionEvent::Started(a, b, _) => (*a, *b, OverlapKind::Entered),
            CollisionEvent::Stopped(a, b, _) => (*a, *b, OverlapKind::Exited),
        };

        let pair = if controllers.contains(a) && volumes.contains(b) {
            Some((a, b))
        } else if controllers.contains(b) && volumes.contains(a) {
            Some((b, a))
        } else {
            None
        };

        if let Some((controller, volume)) = pair {
            overlaps.write(VolumeOverlapEvent {
                controller,
                volume,
                kind,
            });
        }
    }
}

/// Bundle for spawning a platformer character with rapier physics.
///
/// The body is position-based kinematic: the controller writes the
/// transform directly and rapier only tracks the collider for queries and
/// sensor overlaps.
#[derive(Bundle)]
pub struct RapierPlatformerBundle {
    /// The controller itself.
    pub controller: PlatformerController,
    /// Kinematic body moved by the controller.
    pub rigid_body: RigidBody,
    /// Box collider matching the controller's shape.
    pub collider: Collider,
    /// Listen for sensor overlaps so physics volumes work out of the box.
    pub active_events: ActiveEvents,
}

impl RapierPlatformerBundle {
    /// Create a character bundle from a controller, deriving the rapier
    /// collider from the controller's shape.
    pub fn new(controller: PlatformerController) -> Self {
        let shape = controller.collider_shape();
        Self {
            controller,
            rigid_body: RigidBody::KinematicPositionBased,
            collider: Collider::cuboid(shape.size.x / 2.0, shape.size.y / 2.0),
            active_events: ActiveEvents::COLLISION_EVENTS,
        }
    }
}

/// Bundle for spawning a static platform collider.
#[derive(Bundle)]
pub struct PlatformBundle {
    /// Layer classification read back from probe hits.
    pub layer: PlatformLayer,
    /// Fixed body.
    pub rigid_body: RigidBody,
    /// Platform collider.
    pub collider: Collider,
    /// Groups mirroring the layer bits for probe filtering.
    pub collision_groups: CollisionGroups,
}

impl PlatformBundle {
    /// A solid platform of the given half extents.
    pub fn fixed(half_extents: Vec2) -> Self {
        Self::on_layers(half_extents, CollisionMask::PLATFORM)
    }

    /// A platform of the given half extents on specific layers.
    pub fn on_layers(half_extents: Vec2, mask: CollisionMask) -> Self {
        Self {
            layer: PlatformLayer(mask),
            rigid_body: RigidBody::Fixed,
            collider: Collider::cuboid(half_extents.x, half_extents.y),
            collision_groups: platform_collision_groups(mask),
        }
    }
}
