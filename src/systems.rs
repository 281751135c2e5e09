//! Backend-independent systems: suppression timers, volume overrides and
//! state marker sync. The step itself is registered by the backend plugin.

use bevy::ecs::entity::EntityHashMap;
use bevy::prelude::*;

use crate::controller::PlatformerController;
use crate::events::{OverlapKind, PhysicsVolume, VolumeOverlapEvent};
use crate::state::{Airborne, Grounded, TouchingCeiling, TouchingWall};

/// Advance collision suppression windows, restoring masks on expiry.
pub fn advance_suppression_timers(
    time: Res<Time>,
    mut controllers: Query<&mut PlatformerController>,
) {
    let dt = time.delta_secs();
    for mut controller in controllers.iter_mut() {
        controller.advance_suppression(dt);
    }
}

/// Apply and clear volume parameter overrides from overlap events.
///
/// Overlapping volumes do not stack: the last volume entered owns the
/// override, and only the owning volume's exit clears it.
pub fn apply_volume_overrides(
    mut overlaps: EventReader<VolumeOverlapEvent>,
    volumes: Query<&PhysicsVolume>,
    mut controllers: Query<&mut PlatformerController>,
    mut owners: Local<EntityHashMap<Entity>>,
) {
    for overlap in overlaps.read() {
        let Ok(mut controller) = controllers.get_mut(overlap.controller) else {
            continue;
        };
        match overlap.kind {
            OverlapKind::Entered => {
                if let Ok(volume) = volumes.get(overlap.volume) {
                    owners.insert(overlap.controller, overlap.volume);
                    controller.apply_override(volume.parameters.clone());
                }
            }
            OverlapKind::Exited => {
                if owners.get(&overlap.controller) == Some(&overlap.volume) {
                    owners.remove(&overlap.controller);
                    controller.clear_override();
                }
            }
        }
    }
}

/// Mirror the controller state into marker components so gameplay systems
/// can filter queries with `With<Grounded>` and friends.
pub fn sync_state_markers(
    mut commands: Commands,
    controllers: Query<(Entity, &PlatformerController)>,
) {
    for (entity, controller) in controllers.iter() {
        let state = controller.state();
        let mut entity_commands = commands.entity(entity);

        if state.is_grounded() {
            entity_commands.insert(Grounded).remove::<Airborne>();
        } else {
            entity_commands.insert(Airborne).remove::<Grounded>();
        }

        if state.is_colliding_left {
            entity_commands.insert(TouchingWall::new(Vec2::NEG_X));
        } else if state.is_colliding_right {
            entity_commands.insert(TouchingWall::new(Vec2::X));
        } else {
            entity_commands.remove::<TouchingWall>();
        }

        if state.is_colliding_above {
            entity_commands.insert(TouchingCeiling);
        } else {
            entity_commands.remove::<TouchingCeiling>();
        }
    }
}
