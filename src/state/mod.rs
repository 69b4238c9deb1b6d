//! Dual-keyframe entity state and the snapshots that publish it.
//!
//! Every tick commit produces one [`EntityState`] per entity: the values at
//! the start of the tick (`first`) and at its end (`second`). A renderer
//! running at its own rate samples any fraction in between.

pub mod clock;
pub mod snapshot;

use glam::{Quat, Vec3};

pub use clock::RenderClock;
pub use snapshot::{Snapshot, SnapshotCell, SnapshotEntry, WorldView};

/// One exact value of an entity's motion at a tick boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
}

impl Keyframe {
    pub fn new(position: Vec3, rotation: Quat, velocity: Vec3) -> Self {
        Self {
            position,
            rotation,
            velocity,
        }
    }

    /// At rest.
    pub fn at(position: Vec3, rotation: Quat) -> Self {
        Self::new(position, rotation, Vec3::ZERO)
    }
}

/// Immutable motion of an entity across one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityState {
    first: Keyframe,
    second: Keyframe,
}

impl EntityState {
    pub fn new(first: Keyframe, second: Keyframe) -> Self {
        Self { first, second }
    }

    /// No motion this tick: both keyframes are the same value.
    pub fn fixed(position: Vec3, rotation: Quat) -> Self {
        let key = Keyframe::at(position, rotation);
        Self::new(key, key)
    }

    /// Fallback for an entity with no committed tick yet: the second
    /// keyframe is guessed from the velocity over one tick of `dt` seconds.
    pub fn extrapolated(position: Vec3, rotation: Quat, velocity: Vec3, dt: f32) -> Self {
        Self::new(
            Keyframe::new(position, rotation, velocity),
            Keyframe::new(position + velocity * dt, rotation, velocity),
        )
    }

    /// Rotate the keyframes at a tick commit: the old second becomes first.
    #[must_use]
    pub fn advance(&self, next: Keyframe) -> Self {
        Self::new(self.second, next)
    }

    pub fn first(&self) -> &Keyframe {
        &self.first
    }

    pub fn second(&self) -> &Keyframe {
        &self.second
    }

    pub fn is_static(&self) -> bool {
        self.first == self.second
    }

    /// Position at tick fraction `f`. The endpoints are returned exactly;
    /// values above 1 extrapolate along the tick's motion.
    pub fn position(&self, f: f32) -> Vec3 {
        lerp_exact(self.first.position, self.second.position, f)
    }

    /// Orientation at fraction `f`, always a unit quaternion.
    ///
    /// Extrapolation is not applied to rotation; `f` is clamped to `[0, 1]`.
    pub fn rotation(&self, f: f32) -> Quat {
        let f = f.clamp(0.0, 1.0);
        if f == 0.0 {
            return self.first.rotation.normalize();
        }
        if f == 1.0 {
            return self.second.rotation.normalize();
        }
        self.first
            .rotation
            .normalize()
            .slerp(self.second.rotation.normalize(), f)
            .normalize()
    }

    pub fn velocity(&self, f: f32) -> Vec3 {
        lerp_exact(self.first.velocity, self.second.velocity, f)
    }

    /// Offset both keyframes by `displacement` expressed in each keyframe's
    /// own orientation (an attachment point on a moving parent).
    #[must_use]
    pub fn add_relative(&self, displacement: Vec3) -> Self {
        let shift = |key: &Keyframe| Keyframe {
            position: key.position + key.rotation * displacement,
            ..*key
        };
        Self::new(shift(&self.first), shift(&self.second))
    }
}

#[inline]
fn lerp_exact(a: Vec3, b: Vec3, f: f32) -> Vec3 {
    if f == 0.0 {
        a
    } else if f == 1.0 {
        b
    } else {
        a * (1.0 - f) + b * f
    }
}
