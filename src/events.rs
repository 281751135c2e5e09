//! Events emitted by the controller and the physics volume component.

use bevy::prelude::*;

use crate::collision::RayHit;
use crate::config::ControllerParameters;

/// Emitted after a step in which the controller touched something.
///
/// Carries the wall contacts recorded by the side probe so gameplay code
/// and backends can react; the rapier backend uses it to push dynamic
/// bodies.
#[derive(Event, Debug, Clone)]
pub struct ControllerHitEvent {
    /// The controller entity that collided.
    pub entity: Entity,
    /// Wall contacts recorded this step.
    pub contacts: Vec<RayHit>,
    /// External force in effect during the step, before it was cleared.
    pub external_force: Vec2,
}

/// Whether an overlap with a [`PhysicsVolume`] began or ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapKind {
    Entered,
    Exited,
}

/// Emitted by a backend when a controller starts or stops overlapping a
/// [`PhysicsVolume`].
#[derive(Event, Debug, Clone, Copy)]
pub struct VolumeOverlapEvent {
    /// The controller entity.
    pub controller: Entity,
    /// The volume entity.
    pub volume: Entity,
    /// Enter or exit.
    pub kind: OverlapKind,
}

/// A region that overrides the parameters of any controller inside it.
///
/// Attach to a sensor collider. Overlapping controllers run with this
/// parameter set until they leave; when volumes overlap, the last one
/// entered wins.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct PhysicsVolume {
    /// Parameters applied to controllers inside the volume.
    pub parameters: ControllerParameters,
}

impl PhysicsVolume {
    /// Create a volume applying the given parameters.
    pub fn new(parameters: ControllerParameters) -> Self {
        Self { parameters }
    }
}

impl Default for PhysicsVolume {
    fn default() -> Self {
        Self {
            parameters: ControllerParameters::default(),
        }
    }
}
