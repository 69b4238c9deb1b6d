//! Collision values produced by the narrow phase.
//!
//! Polygon tests answer in the struck shape's local frame ([`LocalCollision`]).
//! Before anything is compared or delivered across entities the value is
//! converted once into a world-space [`Collision`]; the conversion consumes the
//! local value so it cannot be reused afterward.

use std::cmp::Ordering;

use glam::Vec3;

use crate::ecs::components::transform::Transform;
use crate::identity::EntityId;

/// Hit against a polygon, expressed in that polygon's local frame.
///
/// Intentionally neither `Copy` nor `Clone`.
#[derive(Debug, PartialEq)]
#[must_use]
pub struct LocalCollision {
    /// Fraction of the tested segment at which contact occurs, in (0, 1].
    pub time_scalar: f32,
    /// Polygon normal, not necessarily unit length.
    pub normal: Vec3,
    /// Contact point on the polygon plane.
    pub hit_position: Vec3,
}

impl LocalCollision {
    /// Convert into world space using the struck shape's transform.
    pub fn into_world(self, transform: &Transform, source: EntityId) -> Collision {
        Collision {
            time_scalar: self.time_scalar,
            normal: transform.transform_normal(self.normal),
            hit_position: transform.transform_point(self.hit_position),
            source,
        }
    }
}

/// World-space collision delivered to an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// Fraction of the tick's motion at which contact occurs, in (0, 1].
    pub time_scalar: f32,
    /// Unit normal pointing toward the receiving entity.
    pub normal: Vec3,
    /// Contact point in world space.
    pub hit_position: Vec3,
    /// The other participant.
    pub source: EntityId,
}

impl Collision {
    /// Earliest first.
    #[inline]
    pub fn cmp_time(&self, other: &Collision) -> Ordering {
        self.time_scalar.total_cmp(&other.time_scalar)
    }

    /// Keep whichever of the two happens first (`current` wins ties).
    pub fn earliest(current: Option<Collision>, candidate: Collision) -> Option<Collision> {
        match current {
            Some(c) if c.cmp_time(&candidate) != Ordering::Greater => Some(c),
            _ => Some(candidate),
        }
    }

    /// The same contact as seen from the other participant.
    pub fn mirrored(&self, source: EntityId) -> Collision {
        Collision {
            normal: -self.normal,
            source,
            ..*self
        }
    }
}

/// The earliest contact between two bodies, one collision per side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairHit {
    pub time_scalar: f32,
    /// Delivered to the first body of the pair.
    pub first: Collision,
    /// Delivered to the second body of the pair.
    pub second: Collision,
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn collision(t: f32) -> Collision {
        Collision {
            time_scalar: t,
            normal: Vec3::Z,
            hit_position: Vec3::ZERO,
            source: EntityId::from_raw(1),
        }
    }

    #[test]
    fn test_local_to_world_conversion() {
        let local = LocalCollision {
            time_scalar: 0.25,
            normal: Vec3::new(0.0, 0.0, 4.0),
            hit_position: Vec3::new(1.0, 0.0, 0.0),
        };
        let transform = Transform::from_position_rotation(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let world = local.into_world(&transform, EntityId::from_raw(7));

        let eps = 1e-5;
        assert_eq!(world.time_scalar, 0.25);
        assert!((world.normal - Vec3::X).length() < eps);
        assert!((world.hit_position - Vec3::new(10.0, 0.0, -1.0)).length() < eps);
        assert_eq!(world.source, EntityId::from_raw(7));
    }

    #[test]
    fn test_ordering_by_time() {
        let early = collision(0.2);
        let late = collision(0.8);
        assert_eq!(early.cmp_time(&late), Ordering::Less);
        assert_eq!(Collision::earliest(Some(late), early), Some(early));
        assert_eq!(Collision::earliest(Some(early), late), Some(early));
        assert_eq!(Collision::earliest(None, late), Some(late));
    }

    #[test]
    fn test_mirrored_flips_normal() {
        let c = collision(0.5);
        let m = c.mirrored(EntityId::from_raw(9));
        assert_eq!(m.normal, -Vec3::Z);
        assert_eq!(m.time_scalar, 0.5);
        assert_eq!(m.source, EntityId::from_raw(9));
    }
}
