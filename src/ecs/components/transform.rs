//! Transform component for ECS entities.

use glam::{Quat, Vec3};

/// World-space transform. Stores position, rotation, and scale separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform from a position and rotation with unit scale.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Local -> world for a point.
    #[inline]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * (local * self.scale)
    }

    /// World -> local for a point.
    #[inline]
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        (self.rotation.inverse() * (world - self.position)) / self.scale
    }

    /// World -> local for a displacement (no translation).
    #[inline]
    pub fn inverse_transform_vector(&self, world: Vec3) -> Vec3 {
        (self.rotation.inverse() * world) / self.scale
    }

    /// Local -> world for a surface normal (inverse-transpose), normalized.
    #[inline]
    pub fn transform_normal(&self, local: Vec3) -> Vec3 {
        (self.rotation * (local / self.scale)).normalize_or_zero()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
