use phys_bridge::{
    bodies::RigidBody,
    core::{DynamicsWorld, WorldConfig},
    math::{Ray, Vector3},
    shapes::{Plane, Sphere},
};
use approx::assert_relative_eq;
use rand::Rng;
use std::sync::Arc;

const FIXED: f32 = 1.0 / 60.0;

fn world_with_gravity(gravity: Vector3) -> DynamicsWorld {
    DynamicsWorld::new(WorldConfig {
        gravity,
        ..WorldConfig::default()
    })
}

#[test]
fn test_rigid_body_creation() {
    let body = RigidBody::new_dynamic(Arc::new(Sphere::new(1.0)), Vector3::new(0.0, 10.0, 0.0), 2.0);

    assert_eq!(body.get_position(), Vector3::new(0.0, 10.0, 0.0));
    assert!(body.is_dynamic());
    assert!(body.get_linear_velocity().is_zero());
    assert!(body.get_angular_velocity().is_zero());
    assert_relative_eq!(body.get_mass(), 2.0);
    assert_relative_eq!(body.get_inverse_mass(), 0.5);

    let ground = RigidBody::new_static(Arc::new(Plane::new(Vector3::unit_y(), 0.0)), Vector3::zero());
    assert!(ground.is_static());
    assert_eq!(ground.get_inverse_mass(), 0.0);
}

#[test]
fn test_gravity_simulation() {
    let mut world = world_with_gravity(Vector3::new(0.0, -9.81, 0.0));
    let handle = world.add_body(RigidBody::new_dynamic(Arc::new(Sphere::new(1.0)), Vector3::new(0.0, 10.0, 0.0), 1.0));

    for _ in 0..60 {
        world.step_simulation(FIXED, 1, FIXED);
    }

    let body = world.get_body(handle).unwrap();
    assert_relative_eq!(body.get_linear_velocity().y, -9.81, epsilon = 0.1);
    let fallen = 10.0 - body.get_position().y;
    assert!(fallen > 4.5 && fallen < 5.5, "fell {}", fallen);

    // The reported transform follows the body
    assert_eq!(body.get_motion_state().position, body.get_position());
}

#[test]
fn test_sphere_rests_on_plane() {
    let mut world = world_with_gravity(Vector3::new(0.0, -9.81, 0.0));
    world.add_body(RigidBody::new_static(Arc::new(Plane::new(Vector3::unit_y(), 0.0)), Vector3::zero()));
    let ball = world.add_body(RigidBody::new_dynamic(Arc::new(Sphere::new(1.0)), Vector3::new(0.0, 3.0, 0.0), 1.0));

    for _ in 0..180 {
        world.step_simulation(FIXED, 1, FIXED);
    }

    let y = world.get_body(ball).unwrap().get_position().y;
    assert!(y > 0.8 && y < 1.2, "ball settled at {}", y);
    assert!(!world.get_manifolds().is_empty());
}

#[test]
fn test_overlapping_spheres_produce_one_manifold() {
    let mut world = world_with_gravity(Vector3::zero());
    world.add_body(RigidBody::new_dynamic(Arc::new(Sphere::new(1.0)), Vector3::zero(), 1.0));
    world.add_body(RigidBody::new_dynamic(Arc::new(Sphere::new(1.0)), Vector3::new(1.0, 0.0, 0.0), 1.0));

    world.step_simulation(FIXED, 1, FIXED);

    let manifolds = world.get_manifolds();
    assert_eq!(manifolds.len(), 1);
    let contact = manifolds[0].first_contact().unwrap();
    assert_relative_eq!(contact.normal.length(), 1.0, epsilon = 1e-4);
}

#[test]
fn test_force_application() {
    let mut world = world_with_gravity(Vector3::zero());
    let handle = world.add_body(RigidBody::new_dynamic(Arc::new(Sphere::new(1.0)), Vector3::zero(), 2.0));

    // Impulses change velocity at once
    world.get_body_mut(handle).unwrap().apply_central_impulse(Vector3::new(2.0, 0.0, 0.0));
    assert_relative_eq!(world.get_body(handle).unwrap().get_linear_velocity().x, 1.0);

    // Forces act over the next step and are then cleared
    world.get_body_mut(handle).unwrap().apply_central_force(Vector3::new(0.0, 120.0, 0.0));
    world.step_simulation(FIXED, 1, FIXED);

    let body = world.get_body(handle).unwrap();
    assert_relative_eq!(body.get_linear_velocity().y, 1.0, epsilon = 1e-4);
    assert!(body.get_total_force().is_zero());
}

#[test]
fn test_static_bodies_do_not_move() {
    let mut world = world_with_gravity(Vector3::new(0.0, -9.81, 0.0));
    let mut rng = rand::thread_rng();
    let positions: Vec<Vector3> = (0..10)
        .map(|_| Vector3::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)))
        .collect();
    let handles: Vec<_> = positions
        .iter()
        .map(|position| world.add_body(RigidBody::new_static(Arc::new(Sphere::new(0.5)), *position)))
        .collect();

    for _ in 0..30 {
        world.step_simulation(FIXED, 1, FIXED);
    }

    for (handle, position) in handles.iter().zip(&positions) {
        assert_eq!(world.get_body(*handle).unwrap().get_position(), *position);
    }
}

#[test]
fn test_ray_casting() {
    let mut world = world_with_gravity(Vector3::zero());
    let handle = world.add_body(RigidBody::new_static(Arc::new(Sphere::new(1.0)), Vector3::zero()));

    let ray = Ray::new(Vector3::new(0.0, 10.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
    let (hit_body, hit) = world.ray_test(&ray, 100.0).unwrap();
    assert_eq!(hit_body, handle);
    assert_relative_eq!(hit.distance, 9.0, epsilon = 1e-4);

    let miss = Ray::new(Vector3::new(5.0, 10.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
    assert!(world.ray_test(&miss, 100.0).is_none());
}

#[test]
fn test_fixed_step_accumulator() {
    let mut world = world_with_gravity(Vector3::zero());

    // Half a step does nothing yet but carries over
    assert_eq!(world.step_simulation(FIXED * 0.5, 4, FIXED), 0);
    assert_eq!(world.step_simulation(FIXED * 0.5, 4, FIXED), 1);

    // More steps than allowed are reported but clamped
    assert_eq!(world.step_simulation(FIXED * 6.0, 2, FIXED), 6);
    assert_relative_eq!(world.get_time(), FIXED * 3.0, epsilon = 1e-5);
}
