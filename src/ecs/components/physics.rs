//! Physics components for ECS entities.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use crate::physics::collider::Collider;
use crate::physics::response::{CollisionResponse, Inert};
use crate::state::EntityState;

/// Capability: the entity moves under its own velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Movable {
    /// World units per second.
    pub velocity: Vec3,
    /// Radians per second about world axes.
    pub angular_velocity: Vec3,
}

impl Movable {
    pub fn new(velocity: Vec3) -> Self {
        Self {
            velocity,
            angular_velocity: Vec3::ZERO,
        }
    }
}

/// Capability: the entity takes part in collision detection.
pub struct Touchable {
    pub collider: Arc<Collider>,
    /// Receives every collision this entity is part of.
    pub response: Box<dyn CollisionResponse>,
    /// If true, the entity is reported to others as a sensor (checkpoints).
    pub is_sensor: bool,
}

impl Touchable {
    pub fn new(collider: Collider) -> Self {
        Self {
            collider: Arc::new(collider),
            response: Box::new(Inert),
            is_sensor: false,
        }
    }

    pub fn with_response(mut self, response: impl CollisionResponse + 'static) -> Self {
        self.response = Box::new(response);
        self
    }

    pub fn sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }
}

impl fmt::Debug for Touchable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Touchable")
            .field("collider", &self.collider)
            .field("is_sensor", &self.is_sensor)
            .finish_non_exhaustive()
    }
}

/// Ticks left before the entity is overdue and removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime {
    pub remaining_ticks: u32,
}

/// The last committed keyframe pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframes(pub EntityState);
