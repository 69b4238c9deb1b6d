//! Swept bodies and motion integration.

use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::ecs::components::physics::{Movable, Touchable};
use crate::ecs::components::transform::Transform;
use crate::identity::EntityId;

use super::collider::{Collider, PhysicsAabb};

/// A touchable entity's linear motion through the current tick.
///
/// Time is the global tick fraction in `[0, 1]`. The body sits at `origin`
/// at time `from` and moves by `velocity * dt` over a full tick. Collisions
/// re-base the body at the contact time.
#[derive(Debug, Clone)]
pub struct SweptBody {
    pub id: EntityId,
    pub entity: hecs::Entity,
    pub collider: Arc<Collider>,
    pub rotation: Quat,
    pub scale: Vec3,
    pub origin: Vec3,
    pub from: f32,
    pub velocity: Vec3,
    pub dt: f32,
    pub movable: bool,
    pub sensor: bool,
    pub active: bool,
}

impl SweptBody {
    /// Body at the start of a tick of length `dt`.
    pub fn new(
        id: EntityId,
        entity: hecs::Entity,
        transform: &Transform,
        collider: Arc<Collider>,
        velocity: Option<Vec3>,
        dt: f32,
    ) -> Self {
        Self {
            id,
            entity,
            collider,
            rotation: transform.rotation,
            scale: transform.scale,
            origin: transform.position,
            from: 0.0,
            velocity: velocity.unwrap_or(Vec3::ZERO),
            dt,
            movable: velocity.is_some(),
            sensor: false,
            active: true,
        }
    }

    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    /// Displacement over one full tick.
    #[inline]
    pub fn displacement(&self) -> Vec3 {
        self.velocity * self.dt
    }

    #[inline]
    pub fn position_at(&self, t: f32) -> Vec3 {
        self.origin + self.displacement() * (t - self.from)
    }

    pub fn transform_at(&self, t: f32) -> Transform {
        Transform {
            position: self.position_at(t),
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    /// Bounds of the remaining sweep, from `from` to the end of the tick.
    pub fn swept_extent(&self) -> PhysicsAabb {
        self.collider
            .swept_aabb(&self.transform_at(self.from), &self.transform_at(1.0))
    }

    /// Restart the sweep at `t`. Must run before the velocity changes.
    pub fn rebase(&mut self, t: f32) {
        self.origin = self.position_at(t);
        self.from = t;
    }

    /// Not moving this tick.
    pub fn is_static(&self) -> bool {
        !self.movable || self.velocity == Vec3::ZERO
    }
}

/// Apply angular velocity (radians per second, world axes) over `dt`.
#[inline]
pub fn integrate_rotation(rotation: Quat, angular_velocity: Vec3, dt: f32) -> Quat {
    if angular_velocity == Vec3::ZERO {
        return rotation;
    }
    (Quat::from_scaled_axis(angular_velocity * dt) * rotation).normalize()
}

/// Move entities that have no collider; they never take part in collisions.
pub fn integrate_free_bodies(world: &mut hecs::World, dt: f32) {
    for (_, (transform, movable, touchable)) in
        world.query_mut::<(&mut Transform, &Movable, Option<&Touchable>)>()
    {
        if touchable.is_some() {
            continue;
        }
        transform.position += movable.velocity * dt;
        transform.rotation = integrate_rotation(transform.rotation, movable.angular_velocity, dt);
    }
}
