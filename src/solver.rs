//! The per-step movement resolution pipeline.
//!
//! [`step`] advances one character by one fixed timestep: integrate
//! gravity, couple to a moving platform, fan rays out to the side of
//! motion, below and above, clamp the pending displacement against the
//! hits, translate, then derive the new velocity from the displacement
//! actually performed. The pipeline is pure with respect to the world; all
//! geometry questions go through the [`PhysicsProbe`].
//!
//! Order matters and is load-bearing: the side pass runs before the below
//! pass so a wall contact zeroes horizontal displacement before the below
//! origins are offset by it, and the above pass sees the displacement
//! already clamped by the other two.

use bevy::prelude::*;

use crate::collision::{lerp_point, RayHit};
use crate::controller::PlatformerController;
use crate::probe::PhysicsProbe;

/// Epsilon under which displacements and comparisons collapse to zero.
pub(crate) const SMALL_VALUE: f32 = 0.0001;

/// Vertical inset of the lowest and highest side-probe origins, so short
/// steps and floor seams are not mistaken for walls.
pub(crate) const OBSTACLE_HEIGHT_TOLERANCE: f32 = 0.05;

/// Strong downward pull applied while riding a moving platform, keeping
/// the character glued through the platform's own vertical motion.
pub(crate) const MOVING_PLATFORM_GRAVITY: f32 = -500.0;

/// Advance `controller` by one step of `dt` seconds, translating
/// `position` by the resolved displacement.
///
/// Does nothing when `dt` is zero, negative or non-finite, so a paused
/// clock freezes the character without corrupting its state.
pub fn step<P: PhysicsProbe>(
    controller: &mut PlatformerController,
    position: &mut Vec2,
    probe: &P,
    dt: f32,
) {
    if !dt.is_finite() || dt <= 0.0 {
        return;
    }

    apply_gravity(controller, dt);
    frame_initialization(controller, *position, dt);
    handle_moving_platforms(controller, position, probe, dt);
    controller.forces_applied = controller.speed;

    cast_rays_to_the_sides(controller, probe, dt);
    cast_rays_below(controller, probe, dt);
    cast_rays_above(controller, probe);

    *position += controller.new_position;
    controller.update_bounds(*position);

    compute_new_speed(controller, dt);
    set_states(controller);

    controller.external_force = Vec2::ZERO;
}

/// Integrate gravity into vertical speed, shaped by the ascent and fall
/// multipliers and the optional fall-slow factor.
fn apply_gravity(controller: &mut PlatformerController, dt: f32) {
    let params = controller.effective_parameters();
    let mut gravity = params.gravity;
    if controller.speed.y > 0.0 {
        gravity /= params.ascent_multiplier;
    }
    if controller.speed.y < 0.0 {
        gravity *= params.fall_multiplier;
    }
    controller.current_gravity = gravity;

    if controller.gravity_active {
        controller.speed.y += (gravity + controller.moving_platform_gravity) * dt;
    }
    if controller.fall_slow_factor != 0.0 {
        controller.speed.y *= controller.fall_slow_factor;
    }
}

/// Snapshot last frame's outcome, reset the per-step flags and seed the
/// pending displacement from the current speed.
fn frame_initialization(controller: &mut PlatformerController, position: Vec2, dt: f32) {
    controller.contacts.clear();
    controller.new_position = controller.speed * dt;
    controller.state.was_grounded_last_frame = controller.state.is_colliding_below;
    controller.state.was_touching_the_ceiling_last_frame = controller.state.is_colliding_above;
    controller.current_wall = None;
    controller.state.reset();
    controller.update_bounds(position);
}

/// Carry the character along with the platform it is attached to.
///
/// The platform's full velocity translates the character directly; the
/// pending vertical displacement is then rebuilt from the platform's
/// vertical motion so the below probe lands back on its surface.
fn handle_moving_platforms<P: PhysicsProbe>(
    controller: &mut PlatformerController,
    position: &mut Vec2,
    probe: &P,
    dt: f32,
) {
    let Some(platform) = controller.moving_platform else {
        return;
    };
    let Some(velocity) = probe.platform_velocity(platform) else {
        // Platform despawned out from under us.
        controller.detach_from_moving_platform();
        return;
    };
    if !velocity.x.is_finite() || !velocity.y.is_finite() {
        return;
    }
    controller.moving_platform_velocity = velocity;

    *position += velocity * dt;
    controller.update_bounds(*position);

    controller.state.on_a_moving_platform = true;
    controller.gravity_active = false;
    controller.moving_platform_gravity = MOVING_PLATFORM_GRAVITY;

    controller.new_position.y = velocity.y * dt;
    controller.speed = -controller.new_position / dt;
    controller.speed.x = -controller.speed.x;
}

/// Probe horizontally in the direction of travel and clamp against walls.
///
/// Surfaces steeper than the walkable slope limit count as walls; anything
/// shallower is left for the below pass to resolve as ground.
fn cast_rays_to_the_sides<P: PhysicsProbe>(
    controller: &mut PlatformerController,
    probe: &P,
    dt: f32,
) {
    let mut movement_direction = 1.0_f32;
    if controller.speed.x < 0.0 || controller.external_force.x < 0.0 {
        movement_direction = -1.0;
    }
    if controller.moving_platform.is_some()
        && controller.moving_platform_velocity.x.abs() > controller.speed.x.abs()
    {
        movement_direction = controller.moving_platform_velocity.x.signum();
    }

    let maximum_slope_angle = controller.effective_parameters().maximum_slope_angle;
    let ray_offset = controller.raycast.ray_offset;
    let width = controller.bounds.width();
    let center = controller.bounds.center();
    let ray_length = controller.speed.x.abs() * dt + width / 2.0 + 2.0 * ray_offset;

    let bottom = Vec2::new(center.x, controller.bounds.min.y + OBSTACLE_HEIGHT_TOLERANCE);
    let top = Vec2::new(center.x, controller.bounds.max.y - OBSTACLE_HEIGHT_TOLERANCE);
    let direction = Vec2::new(movement_direction, 0.0);

    let count = controller.raycast.horizontal_ray_count.max(2);
    for i in 0..count {
        let origin = lerp_point(bottom, top, i as f32 / (count - 1) as f32);

        // Only the lowest ray of a grounded character sees one-way
        // platforms, so it can climb their edge without being walled by
        // one mid-air.
        let mask = if controller.state.was_grounded_last_frame && i == 0 {
            controller.layers.platform_mask
        } else {
            controller.layers.without_one_way()
        };

        let Some(hit) = probe.raycast(origin, direction, ray_length, mask) else {
            continue;
        };
        if Some(hit.collider) == controller.ignored_collider {
            break;
        }

        let hit_angle = unsigned_angle(hit.normal, Vec2::Y);
        controller.state.lateral_slope_angle = hit_angle;

        // Tolerance keeps the boundary inclusive despite acos rounding on
        // normals built for the limit angle exactly.
        if hit_angle <= maximum_slope_angle + SMALL_VALUE {
            controller.state.slope_angle_ok = true;
            continue;
        }

        if movement_direction < 0.0 {
            controller.state.is_colliding_left = true;
        } else {
            controller.state.is_colliding_right = true;
        }
        controller.current_wall = Some(hit.collider);
        controller.state.slope_angle_ok = false;

        controller.new_position.x = if movement_direction <= 0.0 {
            -(hit.point.x - center.x).abs() + width / 2.0 + 2.0 * ray_offset
        } else {
            (hit.point.x - center.x).abs() - width / 2.0 - 2.0 * ray_offset
        };
        // Airborne wall contact stops horizontal motion dead instead of
        // pushing back, so wall slides stay flush.
        if !controller.state.is_grounded() {
            controller.new_position.x = 0.0;
        }

        controller.contacts.push(hit);
        controller.speed.x = 0.0;
        break;
    }
}

/// Probe downward and settle the character on the closest surface.
fn cast_rays_below<P: PhysicsProbe>(controller: &mut PlatformerController, probe: &P, dt: f32) {
    controller.friction = 0.0;
    controller.state.is_falling = controller.new_position.y < -SMALL_VALUE;

    if controller.effective_parameters().gravity >= 0.0 && !controller.state.is_falling {
        return;
    }

    let height = controller.bounds.height();
    let ray_offset = controller.raycast.ray_offset;

    let mut ray_length = height / 2.0 + ray_offset;
    if controller.state.on_a_moving_platform {
        ray_length *= 2.0;
    }
    if controller.new_position.y < 0.0 {
        ray_length += controller.new_position.y.abs();
    }

    let origin_y = controller.bounds.center().y + ray_offset;
    let left = Vec2::new(controller.bounds.min.x + controller.new_position.x, origin_y);
    let right = Vec2::new(controller.bounds.max.x + controller.new_position.x, origin_y);

    // A rising character that was not grounded passes through one-way
    // platforms from underneath.
    let mask = if controller.new_position.y > 0.0 && !controller.state.was_grounded_last_frame {
        controller.layers.without_one_way()
    } else {
        controller.layers.platform_mask
    };

    let count = controller.raycast.vertical_ray_count.max(2);
    let mut closest: Option<RayHit> = None;
    for i in 0..count {
        let origin = lerp_point(left, right, i as f32 / (count - 1) as f32);
        if let Some(hit) = probe.raycast(origin, Vec2::NEG_Y, ray_length, mask) {
            if Some(hit.collider) == controller.ignored_collider {
                continue;
            }
            if closest.map_or(true, |c| hit.distance < c.distance) {
                closest = Some(hit);
            }
        }
    }

    match closest {
        Some(closest) => {
            controller.state.below_slope_angle = signed_slope_angle(closest.normal);
            controller.standing_on = Some(closest.collider);

            // Jumped into a one-way platform without clearing it: fall
            // back through instead of snapping up onto its surface.
            if !controller.state.was_grounded_last_frame
                && closest.distance < height / 2.0
                && controller.layers.is_one_way(closest.layers)
            {
                controller.state.is_colliding_below = false;
                return;
            }

            controller.state.is_falling = false;
            controller.state.is_colliding_below = true;

            if controller.external_force.y > 0.0 && controller.speed.y > 0.0 {
                // Mid-jump: keep the raw ascent and report airborne.
                controller.new_position.y = controller.speed.y * dt;
                controller.state.is_colliding_below = false;
            } else {
                let distance_to_hit = (closest.point.y - origin_y).abs();
                controller.new_position.y = -distance_to_hit + height / 2.0 + ray_offset;
            }
            if !controller.state.was_grounded_last_frame && controller.speed.y > 0.0 {
                controller.new_position.y += controller.speed.y * dt;
            }
            if controller.new_position.y.abs() < SMALL_VALUE {
                controller.new_position.y = 0.0;
            }

            if let Some(friction) = probe.surface_friction(closest.collider) {
                controller.friction = friction;
            }

            if probe.platform_velocity(closest.collider).is_some()
                && controller.state.is_grounded()
            {
                controller.attach_to_moving_platform(closest.collider);
            } else {
                controller.detach_from_moving_platform();
            }
        }
        None => {
            controller.state.is_colliding_below = false;
            if controller.moving_platform.is_some() {
                controller.detach_from_moving_platform();
            }
        }
    }

    if controller.raycast.stick_when_walking_down_slopes {
        stick_to_slope(controller, probe);
    }
}

/// Keep a grounded character flush with the ground across downhill slope
/// transitions, where plain integration would launch it off the crest.
fn stick_to_slope<P: PhysicsProbe>(controller: &mut PlatformerController, probe: &P) {
    if controller.new_position.y >= 0.0
        || !controller.state.was_grounded_last_frame
        || controller.external_force.y > 0.0
        || controller.moving_platform.is_some()
    {
        return;
    }

    let height = controller.bounds.height();
    let ray_offset = controller.raycast.ray_offset;

    let ray_length = if controller.raycast.sticky_raycast_length == 0.0 {
        let maximum_slope_angle = controller.effective_parameters().maximum_slope_angle;
        controller.bounds.width() * maximum_slope_angle.to_radians().tan().abs()
            + height / 2.0
            + ray_offset
    } else {
        controller.raycast.sticky_raycast_length
    };

    // Probe from the trailing edge of motion, where the ground falls away
    // first when cresting a slope.
    let edge_x = if controller.new_position.x > 0.0 {
        controller.bounds.min.x
    } else {
        controller.bounds.max.x
    };
    let origin = Vec2::new(
        edge_x + controller.new_position.x,
        controller.bounds.center().y + ray_offset,
    );

    let Some(hit) = probe.raycast(origin, Vec2::NEG_Y, ray_length, controller.layers.platform_mask)
    else {
        return;
    };
    if Some(hit.collider) == controller.ignored_collider {
        return;
    }

    controller.new_position.y = -(hit.point.y - origin.y).abs() + height / 2.0 + ray_offset;
    controller.state.is_colliding_below = true;
}

/// Probe upward and clamp the pending ascent against ceilings.
fn cast_rays_above<P: PhysicsProbe>(controller: &mut PlatformerController, probe: &P) {
    if controller.new_position.y < 0.0 {
        return;
    }

    let height = controller.bounds.height();
    let ray_length = if controller.state.is_grounded() {
        controller.raycast.ray_offset
    } else {
        controller.new_position.y
    } + height / 2.0;

    let origin_y = controller.bounds.center().y;
    let left = Vec2::new(controller.bounds.min.x + controller.new_position.x, origin_y);
    let right = Vec2::new(controller.bounds.max.x + controller.new_position.x, origin_y);

    // One-way platforms never block from below.
    let mask = controller.layers.without_one_way();

    let count = controller.raycast.vertical_ray_count.max(2);
    let mut smallest_distance = f32::MAX;
    let mut hit_connected = false;
    for i in 0..count {
        let origin = lerp_point(left, right, i as f32 / (count - 1) as f32);
        if let Some(hit) = probe.raycast(origin, Vec2::Y, ray_length, mask) {
            if Some(hit.collider) == controller.ignored_collider {
                continue;
            }
            hit_connected = true;
            smallest_distance = smallest_distance.min(hit.distance);
        }
    }

    if hit_connected {
        controller.new_position.y = smallest_distance - height / 2.0;
        if controller.state.is_grounded() && controller.new_position.y < 0.0 {
            controller.new_position.y = 0.0;
        }
        controller.state.is_colliding_above = true;
        // Zero vertical speed only on first contact, so a sustained press
        // against the ceiling does not re-zero an already-zeroed ascent.
        if !controller.state.was_touching_the_ceiling_last_frame {
            controller.speed.y = 0.0;
        }
    }
}

/// Derive the new velocity from the displacement actually performed, shape
/// it by the slope speed curve and clamp to the velocity limits.
fn compute_new_speed(controller: &mut PlatformerController, dt: f32) {
    controller.speed = controller.new_position / dt;

    if controller.state.is_grounded() {
        let signed_angle =
            controller.state.below_slope_angle.abs() * controller.speed.y.signum();
        let factor = controller
            .effective_parameters()
            .slope_angle_speed_factor
            .evaluate(signed_angle);
        controller.speed.x *= factor;
    }

    if !controller.state.on_a_moving_platform {
        let max_velocity = controller.effective_parameters().max_velocity;
        controller.speed.x = controller.speed.x.clamp(-max_velocity.x, max_velocity.x);
        controller.speed.y = controller.speed.y.clamp(-max_velocity.y, max_velocity.y);
    }

    // A wall contact leaves exactly zero horizontal speed, not the
    // rounding residue of the clamped displacement.
    if controller.state.is_colliding_left || controller.state.is_colliding_right {
        controller.speed.x = 0.0;
    }
}

fn set_states(controller: &mut PlatformerController) {
    controller.state.just_got_grounded =
        !controller.state.was_grounded_last_frame && controller.state.is_colliding_below;
}

/// Unsigned angle between two directions, in degrees.
pub(crate) fn unsigned_angle(a: Vec2, b: Vec2) -> f32 {
    a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle of a ground surface from its normal, in degrees, negative when
/// the surface faces upward-right.
pub(crate) fn signed_slope_angle(normal: Vec2) -> f32 {
    let mut angle = unsigned_angle(normal, Vec2::Y);
    if normal.x > 0.0 {
        angle = -angle;
    }
    angle
}
