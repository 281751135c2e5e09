//! Scenario tests driving the solver against fixture geometry.
//!
//! The fixture world implements `PhysicsProbe` over a list of axis-aligned
//! boxes, so every scenario is deterministic and runs without a physics
//! engine or an app.

use bevy::prelude::*;
use raycast_platformer_controller::prelude::*;
use raycast_platformer_controller::solver;

const DT: f32 = 0.02;

/// An axis-aligned box with the lookups the probe exposes.
struct FixtureBox {
    entity: Entity,
    min: Vec2,
    max: Vec2,
    layers: CollisionMask,
    friction: Option<f32>,
    velocity: Option<Vec2>,
}

impl FixtureBox {
    fn solid(entity: u32, min: Vec2, max: Vec2) -> Self {
        Self {
            entity: Entity::from_raw(entity),
            min,
            max,
            layers: CollisionMask::PLATFORM,
            friction: None,
            velocity: None,
        }
    }

    fn one_way(entity: u32, min: Vec2, max: Vec2) -> Self {
        Self {
            layers: CollisionMask::ONE_WAY_PLATFORM,
            ..Self::solid(entity, min, max)
        }
    }

    fn moving(entity: u32, min: Vec2, max: Vec2, velocity: Vec2) -> Self {
        Self {
            layers: CollisionMask::MOVING_PLATFORM,
            velocity: Some(velocity),
            ..Self::solid(entity, min, max)
        }
    }
}

/// Fixture world of axis-aligned boxes.
struct BoxWorld {
    boxes: Vec<FixtureBox>,
}

impl BoxWorld {
    fn new(boxes: Vec<FixtureBox>) -> Self {
        Self { boxes }
    }
}

/// Slab-method ray versus box intersection, returning distance and entry
/// normal.
fn ray_box(origin: Vec2, direction: Vec2, length: f32, min: Vec2, max: Vec2) -> Option<(f32, Vec2)> {
    let mut t_entry = 0.0_f32;
    let mut t_exit = length;
    let mut normal = -direction;

    for axis in 0..2 {
        let (o, d, lo, hi) = if axis == 0 {
            (origin.x, direction.x, min.x, max.x)
        } else {
            (origin.y, direction.y, min.y, max.y)
        };
        if d.abs() < 1e-9 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let mut t1 = (lo - o) / d;
        let mut t2 = (hi - o) / d;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        if t1 > t_entry {
            t_entry = t1;
            normal = if axis == 0 {
                Vec2::new(-d.signum(), 0.0)
            } else {
                Vec2::new(0.0, -d.signum())
            };
        }
        t_exit = t_exit.min(t2);
        if t_entry > t_exit {
            return None;
        }
    }
    Some((t_entry, normal))
}

impl PhysicsProbe for BoxWorld {
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        length: f32,
        mask: CollisionMask,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for fixture in &self.boxes {
            if !mask.intersects(fixture.layers) {
                continue;
            }
            if let Some((distance, normal)) =
                ray_box(origin, direction, length, fixture.min, fixture.max)
            {
                if best.as_ref().map_or(true, |b| distance < b.distance) {
                    best = Some(RayHit::new(
                        distance,
                        origin + direction * distance,
                        normal,
                        fixture.entity,
                        fixture.layers,
                    ));
                }
            }
        }
        best
    }

    fn surface_friction(&self, collider: Entity) -> Option<f32> {
        self.boxes
            .iter()
            .find(|b| b.entity == collider)
            .and_then(|b| b.friction)
    }

    fn platform_velocity(&self, collider: Entity) -> Option<Vec2> {
        self.boxes
            .iter()
            .find(|b| b.entity == collider)
            .and_then(|b| b.velocity)
    }
}

fn character() -> PlatformerController {
    PlatformerController::new(ColliderShape::new(Vec2::new(1.0, 2.0)))
}

fn wide_ground(entity: u32) -> FixtureBox {
    FixtureBox::solid(entity, Vec2::new(-50.0, -1.0), Vec2::new(50.0, 0.0))
}

mod grounding {
    use super::*;

    #[test]
    fn falls_and_rests_on_flat_ground() {
        let world = BoxWorld::new(vec![wide_ground(1)]);
        let mut controller = character();
        let mut position = Vec2::new(0.0, 3.0);

        for _ in 0..120 {
            solver::step(&mut controller, &mut position, &world, DT);
        }

        assert!(controller.is_grounded(), "character should have landed");
        assert!(
            (position.y - 1.0).abs() < 1e-3,
            "resting center should sit at ground top plus half height, was {}",
            position.y
        );
        assert_eq!(controller.speed().y, 0.0);
        assert!(!controller.state().is_falling);
        assert_eq!(controller.standing_on(), Some(Entity::from_raw(1)));
    }

    #[test]
    fn just_got_grounded_fires_exactly_once() {
        let world = BoxWorld::new(vec![wide_ground(1)]);
        let mut controller = character();
        let mut position = Vec2::new(0.0, 2.0);

        let mut landings = 0;
        for _ in 0..120 {
            solver::step(&mut controller, &mut position, &world, DT);
            if controller.state().just_got_grounded {
                landings += 1;
            }
        }
        assert_eq!(landings, 1);
    }

    #[test]
    fn resting_character_stays_put() {
        let world = BoxWorld::new(vec![wide_ground(1)]);
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);

        for _ in 0..60 {
            solver::step(&mut controller, &mut position, &world, DT);
        }

        assert!((position.y - 1.0).abs() < 1e-3);
        assert!((position.x).abs() < 1e-6);
    }

    #[test]
    fn surface_friction_read_while_grounded() {
        let mut ground = wide_ground(1);
        ground.friction = Some(0.5);
        let world = BoxWorld::new(vec![ground]);
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);

        solver::step(&mut controller, &mut position, &world, DT);

        assert_eq!(controller.friction(), 0.5);
    }

    #[test]
    fn friction_resets_when_airborne() {
        let mut ground = wide_ground(1);
        ground.friction = Some(0.5);
        let world = BoxWorld::new(vec![ground]);
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);

        solver::step(&mut controller, &mut position, &world, DT);
        assert_eq!(controller.friction(), 0.5);

        // Launch off the ground; once out of probe range friction clears.
        controller.set_vertical_force(20.0);
        solver::step(&mut controller, &mut position, &world, DT);
        solver::step(&mut controller, &mut position, &world, DT);
        assert_eq!(controller.friction(), 0.0);
    }
}

mod walls {
    use super::*;

    fn walled_world() -> BoxWorld {
        BoxWorld::new(vec![
            wide_ground(1),
            FixtureBox::solid(2, Vec2::new(2.0, -1.0), Vec2::new(3.0, 5.0)),
        ])
    }

    #[test]
    fn grounded_character_is_clamped_against_wall() {
        let world = walled_world();
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);

        for _ in 0..40 {
            controller.set_horizontal_force(10.0);
            solver::step(&mut controller, &mut position, &world, DT);
        }

        // Wall face at x = 2, half width 0.5, skin 2 * 0.05.
        assert!(
            (position.x - 1.4).abs() < 1e-3,
            "clamped position was {}",
            position.x
        );
        assert!(controller.state().is_colliding_right);
        assert!(!controller.state().is_colliding_left);
        assert_eq!(controller.current_wall(), Some(Entity::from_raw(2)));
        assert_eq!(controller.speed().x, 0.0);
        assert!(!controller.contacts().is_empty());
    }

    #[test]
    fn leftward_motion_clamps_against_left_wall() {
        let world = BoxWorld::new(vec![
            wide_ground(1),
            FixtureBox::solid(2, Vec2::new(-3.0, -1.0), Vec2::new(-2.0, 5.0)),
        ]);
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);

        for _ in 0..40 {
            controller.set_horizontal_force(-10.0);
            solver::step(&mut controller, &mut position, &world, DT);
        }

        assert!((position.x + 1.4).abs() < 1e-3, "was {}", position.x);
        assert!(controller.state().is_colliding_left);
        assert_eq!(controller.speed().x, 0.0);
    }

    #[test]
    fn airborne_wall_contact_zeroes_horizontal_motion() {
        let world = BoxWorld::new(vec![FixtureBox::solid(
            2,
            Vec2::new(0.7, -10.0),
            Vec2::new(2.0, 10.0),
        )]);
        let mut controller = character();
        let mut position = Vec2::new(0.0, 0.0);

        controller.set_horizontal_force(5.0);
        solver::step(&mut controller, &mut position, &world, DT);

        assert!(controller.state().is_colliding_right);
        // Airborne contact stops dead instead of pushing back.
        assert_eq!(position.x, 0.0);
        assert!(position.y < 0.0, "gravity still applies");
    }
}

mod slopes {
    use super::*;

    /// Flat ground below plus a prescribed-normal surface for side rays.
    struct SlopeSide {
        wall_normal: Vec2,
    }

    impl PhysicsProbe for SlopeSide {
        fn raycast(
            &self,
            origin: Vec2,
            direction: Vec2,
            length: f32,
            _mask: CollisionMask,
        ) -> Option<RayHit> {
            if direction.y < 0.0 {
                // Ground plane at y = 0.
                let distance = origin.y;
                if distance >= 0.0 && distance <= length {
                    return Some(RayHit::new(
                        distance,
                        Vec2::new(origin.x, 0.0),
                        Vec2::Y,
                        Entity::from_raw(1),
                        CollisionMask::PLATFORM,
                    ));
                }
                return None;
            }
            if direction.x > 0.0 {
                let distance = 0.58_f32;
                if distance <= length {
                    return Some(RayHit::new(
                        distance,
                        origin + direction * distance,
                        self.wall_normal,
                        Entity::from_raw(2),
                        CollisionMask::PLATFORM,
                    ));
                }
            }
            None
        }

        fn surface_friction(&self, _: Entity) -> Option<f32> {
            None
        }

        fn platform_velocity(&self, _: Entity) -> Option<Vec2> {
            None
        }
    }

    fn normal_at_degrees(degrees: f32) -> Vec2 {
        let radians = degrees.to_radians();
        Vec2::new(-radians.sin(), radians.cos())
    }

    fn grounded_on(probe: &impl PhysicsProbe) -> (PlatformerController, Vec2) {
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);
        solver::step(&mut controller, &mut position, probe, DT);
        (controller, position)
    }

    #[test]
    fn surface_at_slope_limit_is_walkable() {
        let probe = SlopeSide {
            wall_normal: normal_at_degrees(30.0),
        };
        let (mut controller, mut position) = grounded_on(&probe);

        controller.set_horizontal_force(3.0);
        solver::step(&mut controller, &mut position, &probe, DT);

        // 30 degrees is the inclusive default limit.
        assert!(!controller.state().is_colliding_right);
        assert!(controller.state().slope_angle_ok);
        assert!((controller.state().lateral_slope_angle - 30.0).abs() < 0.01);
    }

    #[test]
    fn surface_beyond_slope_limit_is_a_wall() {
        let probe = SlopeSide {
            wall_normal: normal_at_degrees(45.0),
        };
        let (mut controller, mut position) = grounded_on(&probe);

        controller.set_horizontal_force(3.0);
        solver::step(&mut controller, &mut position, &probe, DT);

        assert!(controller.state().is_colliding_right);
        assert!(!controller.state().slope_angle_ok);
        assert!((controller.state().lateral_slope_angle - 45.0).abs() < 0.01);
    }

    /// Sloped ground with a prescribed normal for the below rays.
    struct SlopedGround {
        normal: Vec2,
    }

    impl PhysicsProbe for SlopedGround {
        fn raycast(
            &self,
            origin: Vec2,
            direction: Vec2,
            length: f32,
            _mask: CollisionMask,
        ) -> Option<RayHit> {
            if direction.y < 0.0 {
                let distance = origin.y;
                if distance >= 0.0 && distance <= length {
                    return Some(RayHit::new(
                        distance,
                        Vec2::new(origin.x, 0.0),
                        self.normal,
                        Entity::from_raw(1),
                        CollisionMask::PLATFORM,
                    ));
                }
            }
            None
        }

        fn surface_friction(&self, _: Entity) -> Option<f32> {
            None
        }

        fn platform_velocity(&self, _: Entity) -> Option<Vec2> {
            None
        }
    }

    #[test]
    fn below_slope_angle_is_signed_by_facing() {
        let left_facing = SlopedGround {
            normal: Vec2::new(-0.5, 0.866_025_4),
        };
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);
        solver::step(&mut controller, &mut position, &left_facing, DT);
        assert!((controller.state().below_slope_angle - 30.0).abs() < 0.01);

        let right_facing = SlopedGround {
            normal: Vec2::new(0.5, 0.866_025_4),
        };
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);
        solver::step(&mut controller, &mut position, &right_facing, DT);
        assert!((controller.state().below_slope_angle + 30.0).abs() < 0.01);
    }
}

mod one_way_platforms {
    use super::*;

    fn one_way_world() -> BoxWorld {
        BoxWorld::new(vec![FixtureBox::one_way(
            3,
            Vec2::new(-5.0, -0.5),
            Vec2::new(5.0, 0.0),
        )])
    }

    #[test]
    fn rising_character_passes_through_from_below() {
        let world = one_way_world();
        let mut controller = character();
        let mut position = Vec2::new(0.0, -3.0);

        controller.set_vertical_force(30.0);
        solver::step(&mut controller, &mut position, &world, DT);

        assert!(!controller.state().has_collisions());
        assert!(position.y > -3.0, "ascent must not be blocked");
    }

    #[test]
    fn jump_arc_lands_back_on_platform_top() {
        let world = one_way_world();
        let mut controller = character();
        let mut position = Vec2::new(0.0, -3.0);

        controller.set_vertical_force(30.0);
        for _ in 0..250 {
            solver::step(&mut controller, &mut position, &world, DT);
        }

        assert!(controller.is_grounded(), "should land on the platform top");
        assert!(
            (position.y - 1.0).abs() < 1e-3,
            "resting height was {}",
            position.y
        );
        assert_eq!(controller.standing_on(), Some(Entity::from_raw(3)));
    }

    #[test]
    fn shallow_overlap_rejects_snap_through() {
        let world = one_way_world();
        let mut controller = character();
        // Bottom already below the platform surface; closest hit distance
        // is under half the collider height.
        let mut position = Vec2::new(0.0, 0.4);

        solver::step(&mut controller, &mut position, &world, DT);

        assert!(!controller.is_grounded(), "must not snap up onto the top");
        assert!(position.y < 0.4, "keeps falling through instead");
    }

    #[test]
    fn suppression_drops_through_the_platform() {
        let world = one_way_world();
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);

        solver::step(&mut controller, &mut position, &world, DT);
        assert!(controller.is_grounded());

        controller.disable_one_way_collisions(0.5);
        for _ in 0..10 {
            solver::step(&mut controller, &mut position, &world, DT);
        }

        assert!(!controller.is_grounded());
        assert!(position.y < 1.0, "fell through, position {}", position.y);
    }
}

mod moving_platforms {
    use super::*;

    #[test]
    fn character_is_carried_by_the_platform() {
        let mut world = BoxWorld::new(vec![FixtureBox::moving(
            4,
            Vec2::new(-5.0, -1.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(2.0, 0.0),
        )]);
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);

        // First step grounds and attaches.
        solver::step(&mut controller, &mut position, &world, DT);
        assert_eq!(controller.moving_platform(), Some(Entity::from_raw(4)));

        let x_before = position.x;
        for _ in 0..10 {
            solver::step(&mut controller, &mut position, &world, DT);
        }

        assert!(controller.state().on_a_moving_platform);
        assert!(controller.is_grounded());
        assert!(
            (position.x - x_before - 10.0 * 2.0 * DT).abs() < 1e-3,
            "carried horizontally by platform velocity, moved {}",
            position.x - x_before
        );
        assert!((position.y - 1.0).abs() < 0.05, "stays on the surface");

        // Platform stops publishing velocity: the character detaches.
        world.boxes[0].velocity = None;
        solver::step(&mut controller, &mut position, &world, DT);
        assert_eq!(controller.moving_platform(), None);
        solver::step(&mut controller, &mut position, &world, DT);
        assert!(!controller.state().on_a_moving_platform);
    }
}

mod ceilings {
    use super::*;

    fn room() -> BoxWorld {
        BoxWorld::new(vec![
            wide_ground(1),
            FixtureBox::solid(5, Vec2::new(-50.0, 2.5), Vec2::new(50.0, 3.5)),
        ])
    }

    #[test]
    fn ascent_is_clamped_at_the_ceiling() {
        let world = room();
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);

        // Ground first so the jump path engages.
        solver::step(&mut controller, &mut position, &world, DT);

        controller.set_vertical_force(80.0);
        solver::step(&mut controller, &mut position, &world, DT);

        assert!(controller.state().is_colliding_above);
        // Ceiling bottom at 2.5, half height 1: top flush with ceiling.
        assert!(
            (position.y - 1.5).abs() < 1e-3,
            "clamped center was {}",
            position.y
        );
    }

    #[test]
    fn jump_without_obstruction_keeps_raw_displacement() {
        let world = BoxWorld::new(vec![wide_ground(1)]);
        let mut controller = character();
        let mut position = Vec2::new(0.0, 1.0);

        solver::step(&mut controller, &mut position, &world, DT);
        assert!(controller.is_grounded());

        controller.set_vertical_force(8.0);
        solver::step(&mut controller, &mut position, &world, DT);

        // Gravity integrates first, then the raw ascent is kept.
        let expected = 1.0 + (8.0 - 25.0 * DT) * DT;
        assert!(!controller.is_grounded(), "jump must leave the ground");
        assert!(
            (position.y - expected).abs() < 1e-4,
            "position {} expected {}",
            position.y,
            expected
        );
    }
}
