//! Collision consumers.
//!
//! The iteration loop hands each participant a [`Contact`] wrapping its
//! world-space [`Collision`]. What happens next (bounce, damage, removal,
//! nothing) is up to the entity's [`CollisionResponse`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use glam::Vec3;

use super::contact::Collision;
use crate::identity::EntityId;

/// Mutable view of the receiving body handed to a response.
pub struct Contact<'a> {
    pub collision: &'a Collision,
    /// Receiver's velocity; changes take effect from the contact time onward.
    pub velocity: &'a mut Vec3,
    /// Whether the other participant is a sensor.
    pub source_is_sensor: bool,
    destroyed: &'a mut bool,
}

impl<'a> Contact<'a> {
    pub fn new(
        collision: &'a Collision,
        velocity: &'a mut Vec3,
        source_is_sensor: bool,
        destroyed: &'a mut bool,
    ) -> Self {
        Self {
            collision,
            velocity,
            source_is_sensor,
            destroyed,
        }
    }

    /// Remove the receiver from the rest of the tick and from the world.
    pub fn destroy(&mut self) {
        *self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        *self.destroyed
    }

    /// Reflect the velocity off the contact normal if moving into it.
    pub fn bounce(&mut self, restitution: f32) {
        let normal = self.collision.normal;
        let into = self.velocity.dot(normal);
        if into < 0.0 {
            *self.velocity -= normal * into * (1.0 + restitution);
        }
    }
}

/// Per-entity collision callback. The default ignores every collision.
pub trait CollisionResponse: Send + Sync {
    fn accept_collision(&mut self, _contact: &mut Contact<'_>) {}
}

/// Ignores collisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inert;

impl CollisionResponse for Inert {}

/// Reflects off solid contacts.
#[derive(Debug, Clone, Copy)]
pub struct Bounce {
    pub restitution: f32,
}

impl CollisionResponse for Bounce {
    fn accept_collision(&mut self, contact: &mut Contact<'_>) {
        if !contact.source_is_sensor {
            contact.bounce(self.restitution);
        }
    }
}

/// Destroys itself on the first solid contact (bullets, missiles).
#[derive(Debug, Clone, Copy, Default)]
pub struct DestroyOnContact;

impl CollisionResponse for DestroyOnContact {
    fn accept_collision(&mut self, contact: &mut Contact<'_>) {
        if !contact.source_is_sensor {
            contact.destroy();
        }
    }
}

/// Takes fixed damage per solid contact and bounces until health runs out.
#[derive(Debug, Clone, Copy)]
pub struct Hull {
    pub health: f32,
    pub damage_per_hit: f32,
    pub restitution: f32,
}

impl CollisionResponse for Hull {
    fn accept_collision(&mut self, contact: &mut Contact<'_>) {
        if contact.source_is_sensor {
            return;
        }
        self.health -= self.damage_per_hit;
        if self.health <= 0.0 {
            contact.destroy();
        } else {
            contact.bounce(self.restitution);
        }
    }
}

/// Counts the distinct entities that passed through; never alters the body.
#[derive(Debug, Clone, Default)]
pub struct CheckpointGate {
    visitors: HashSet<EntityId>,
    passes: Arc<AtomicU32>,
}

impl CheckpointGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share the pass counter with an outside observer.
    pub fn with_counter(passes: Arc<AtomicU32>) -> Self {
        Self {
            visitors: HashSet::new(),
            passes,
        }
    }

    pub fn passes(&self) -> u32 {
        self.passes.load(Ordering::Relaxed)
    }
}

impl CollisionResponse for CheckpointGate {
    fn accept_collision(&mut self, contact: &mut Contact<'_>) {
        // A hull crosses the ring once per leading vertex.
        if self.visitors.insert(contact.collision.source) {
            self.passes.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EntityId;

    fn collision(normal: Vec3) -> Collision {
        Collision {
            time_scalar: 0.5,
            normal,
            hit_position: Vec3::ZERO,
            source: EntityId::from_raw(2),
        }
    }

    #[test]
    fn test_bounce_reflects_incoming_velocity() {
        let c = collision(Vec3::Y);
        let mut velocity = Vec3::new(1.0, -2.0, 0.0);
        let mut destroyed = false;
        let mut contact = Contact::new(&c, &mut velocity, false, &mut destroyed);
        Bounce { restitution: 1.0 }.accept_collision(&mut contact);
        assert_eq!(velocity, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_bounce_ignores_separating_velocity() {
        let c = collision(Vec3::Y);
        let mut velocity = Vec3::new(0.0, 3.0, 0.0);
        let mut destroyed = false;
        let mut contact = Contact::new(&c, &mut velocity, false, &mut destroyed);
        contact.bounce(0.5);
        assert_eq!(velocity, Vec3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn test_destroy_on_contact_skips_sensors() {
        let c = collision(Vec3::Y);
        let mut velocity = Vec3::ZERO;
        let mut destroyed = false;

        let mut contact = Contact::new(&c, &mut velocity, true, &mut destroyed);
        DestroyOnContact.accept_collision(&mut contact);
        assert!(!contact.is_destroyed());

        let mut contact = Contact::new(&c, &mut velocity, false, &mut destroyed);
        DestroyOnContact.accept_collision(&mut contact);
        assert!(destroyed);
    }

    #[test]
    fn test_hull_breaks_after_enough_hits() {
        let c = collision(Vec3::X);
        let mut hull = Hull {
            health: 50.0,
            damage_per_hit: 25.0,
            restitution: 0.5,
        };
        let mut velocity = Vec3::new(-4.0, 0.0, 0.0);
        let mut destroyed = false;

        hull.accept_collision(&mut Contact::new(&c, &mut velocity, false, &mut destroyed));
        assert!(!destroyed);
        assert_eq!(velocity, Vec3::new(2.0, 0.0, 0.0));

        hull.accept_collision(&mut Contact::new(&c, &mut velocity, false, &mut destroyed));
        assert!(destroyed);
    }

    #[test]
    fn test_checkpoint_counts_passes() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut gate = CheckpointGate::with_counter(Arc::clone(&counter));
        let c = collision(Vec3::Z);
        let mut velocity = Vec3::new(0.0, 0.0, -10.0);
        let mut destroyed = false;
        gate.accept_collision(&mut Contact::new(&c, &mut velocity, false, &mut destroyed));
        gate.accept_collision(&mut Contact::new(&c, &mut velocity, false, &mut destroyed));
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        assert_eq!(gate.passes(), 1);
        assert_eq!(velocity, Vec3::new(0.0, 0.0, -10.0));
    }
}
