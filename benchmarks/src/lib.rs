//! Scene builders shared by the benchmarks.

use std::sync::Arc;

use glam::{Quat, Vec3};
use sortie::ecs::components::transform::Transform;
use sortie::physics::collider::{Collider, PhysicsAabb};
use sortie::physics::rigid_body::SweptBody;
use sortie::spawn::factory::spawn_entity;
use sortie::{EntityId, EntityKind, PhysicsConfig, PhysicsWorld, SpawnRecord};

pub const DT: f32 = 0.05;

/// Deterministic value in [-1, 1) for index `i`.
pub fn jitter(i: usize, salt: u32) -> f32 {
    let mut x = (i as u32).wrapping_mul(0x9E37_79B9) ^ salt.wrapping_mul(0x85EB_CA6B);
    x ^= x >> 16;
    x = x.wrapping_mul(0x7FEB_352D);
    x ^= x >> 15;
    (x as f32 / u32::MAX as f32) * 2.0 - 1.0
}

/// Position on a cubic lattice with `spacing` between neighbours.
pub fn lattice(i: usize, n: usize, spacing: f32) -> Vec3 {
    let side = (n as f32).cbrt().ceil().max(1.0) as usize;
    Vec3::new(
        (i % side) as f32,
        ((i / side) % side) as f32,
        (i / (side * side)) as f32,
    ) * spacing
}

fn drift(i: usize, speed: f32) -> Vec3 {
    Vec3::new(jitter(i, 1), jitter(i, 2), jitter(i, 3)) * speed
}

/// Swept extents of `n` drifting fighters, for the broad phase alone.
pub fn setup_extents(n: usize, spacing: f32) -> (Vec<EntityId>, Vec<PhysicsAabb>) {
    let collider = Arc::new(Collider::cuboid(Vec3::new(2.0, 1.0, 4.0)));
    let bodies: Vec<SweptBody> = (0..n)
        .map(|i| {
            SweptBody::new(
                EntityId::from_raw(i as u64 + 1),
                hecs::Entity::DANGLING,
                &Transform::from_position(lattice(i, n, spacing)),
                Arc::clone(&collider),
                Some(drift(i, 40.0)),
                DT,
            )
        })
        .collect();
    (
        bodies.iter().map(|b| b.id).collect(),
        bodies.iter().map(SweptBody::swept_extent).collect(),
    )
}

/// Mixed fighters, asteroids and missiles on a lattice.
pub fn setup_scene(n: usize, spacing: f32) -> (hecs::World, PhysicsWorld) {
    let mut world = hecs::World::new();
    for i in 0..n {
        let kind = match i % 3 {
            0 => EntityKind::Fighter,
            1 => EntityKind::Asteroid,
            _ => EntityKind::Missile,
        };
        let speed = if kind == EntityKind::Missile { 200.0 } else { 30.0 };
        let record = SpawnRecord::new(
            kind,
            EntityId::from_raw(i as u64 + 1),
            lattice(i, n, spacing),
            Quat::from_rotation_y(jitter(i, 4) * std::f32::consts::PI),
            drift(i, speed),
        );
        spawn_entity(&mut world, &record, DT);
    }
    (world, PhysicsWorld::new(PhysicsConfig::default()))
}

/// A pair of swept bodies with the given separation along X, closing at
/// `speed` units per second.
pub fn setup_pair(
    a: Collider,
    b: Collider,
    separation: f32,
    speed: f32,
) -> (SweptBody, SweptBody) {
    let mover = SweptBody::new(
        EntityId::from_raw(1),
        hecs::Entity::DANGLING,
        &Transform::from_position(Vec3::new(-separation, 0.0, 0.0)),
        Arc::new(a),
        Some(Vec3::new(speed, 0.0, 0.0)),
        DT,
    );
    let target = SweptBody::new(
        EntityId::from_raw(2),
        hecs::Entity::DANGLING,
        &Transform::identity(),
        Arc::new(b),
        None,
        DT,
    );
    (mover, target)
}
