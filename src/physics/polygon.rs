//! Convex planar polygons and the exact segment-vs-polygon test.
//!
//! Every polygon has one front side: the side its normal points to. Segments
//! travelling with the normal (or parallel to the plane) never hit. The test
//! runs in four stages, cheapest first:
//!
//! 1. [`Polygon::has_wrong_direction`] - sign of `direction . normal`
//! 2. [`Polygon::aside_hitbox`] - both endpoints beyond the same bound
//! 3. [`Polygon::hit_scalar`] - plane intersection parameter
//! 4. [`Polygon::encapsulates`] - containment of the planar hit point
//!
//! Degenerate input (zero-length or parallel segments) simply fails one of
//! the early stages.

use glam::Vec3;

use super::collider::PhysicsAabb;
use super::contact::LocalCollision;

/// Hits at or below this segment fraction are ignored.
pub const TIME_EPSILON: f32 = 1e-6;

/// A directed, bounded segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub position: Vec3,
    pub direction: Vec3,
    pub end: Vec3,
}

impl Ray {
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            direction,
            end: position + direction,
        }
    }

    /// Segment with an explicit endpoint.
    pub fn between(start: Vec3, end: Vec3) -> Self {
        Self {
            position: start,
            direction: end - start,
            end,
        }
    }
}

/// Half-plane of one polygon edge, precomputed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePlane {
    origin: Vec3,
    /// `normal x edge`, points into the polygon for counter-clockwise winding.
    inward: Vec3,
}

impl EdgePlane {
    fn new(from: Vec3, to: Vec3, normal: Vec3) -> Self {
        Self {
            origin: from,
            inward: normal.cross(to - from),
        }
    }

    #[inline]
    fn contains(&self, point: Vec3) -> bool {
        (point - self.origin).dot(self.inward) >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PolygonKind {
    Triangle {
        vertices: [Vec3; 3],
        edges: [EdgePlane; 3],
    },
    Quad {
        vertices: [Vec3; 4],
        edges: [EdgePlane; 4],
    },
    /// Flat disc used by checkpoints; containment is a radius test.
    Ring { center: Vec3, radius_squared: f32 },
}

/// A convex planar polygon in its owner's local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    kind: PolygonKind,
    normal: Vec3,
    bounds: PhysicsAabb,
}

impl Polygon {
    /// Triangle wound counter-clockwise when seen from its front.
    pub fn triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (b - a).cross(c - a);
        let vertices = [a, b, c];
        Self {
            kind: PolygonKind::Triangle {
                vertices,
                edges: [
                    EdgePlane::new(a, b, normal),
                    EdgePlane::new(b, c, normal),
                    EdgePlane::new(c, a, normal),
                ],
            },
            normal,
            bounds: PhysicsAabb::from_points(&vertices),
        }
    }

    /// Triangle whose front faces away from `interior`, rewound if needed.
    pub fn triangle_facing_away(a: Vec3, b: Vec3, c: Vec3, interior: Vec3) -> Self {
        let normal = (b - a).cross(c - a);
        if normal.dot(a - interior) < 0.0 {
            Self::triangle(a, c, b)
        } else {
            Self::triangle(a, b, c)
        }
    }

    /// Planar convex quad wound counter-clockwise when seen from its front.
    pub fn quad(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Self {
        let normal = (b - a).cross(c - a);
        let vertices = [a, b, c, d];
        Self {
            kind: PolygonKind::Quad {
                vertices,
                edges: [
                    EdgePlane::new(a, b, normal),
                    EdgePlane::new(b, c, normal),
                    EdgePlane::new(c, d, normal),
                    EdgePlane::new(d, a, normal),
                ],
            },
            normal,
            bounds: PhysicsAabb::from_points(&vertices),
        }
    }

    /// Disc of `radius` around `center`, facing `normal`.
    pub fn ring(center: Vec3, normal: Vec3, radius: f32) -> Self {
        let unit = normal.normalize_or_zero();
        // Extent of a disc along each axis is r * sqrt(1 - n_i^2).
        let spread = (Vec3::ONE - unit * unit).max(Vec3::ZERO);
        let extent = Vec3::new(spread.x.sqrt(), spread.y.sqrt(), spread.z.sqrt()) * radius;
        Self {
            kind: PolygonKind::Ring {
                center,
                radius_squared: radius * radius,
            },
            normal,
            bounds: PhysicsAabb {
                min: center - extent,
                max: center + extent,
            },
        }
    }

    pub fn kind(&self) -> &PolygonKind {
        &self.kind
    }

    /// Face normal as constructed (not necessarily unit length).
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Static local-frame bounds.
    pub fn bounds(&self) -> &PhysicsAabb {
        &self.bounds
    }

    /// Corner vertices; empty for rings.
    pub fn vertices(&self) -> &[Vec3] {
        match &self.kind {
            PolygonKind::Triangle { vertices, .. } => vertices,
            PolygonKind::Quad { vertices, .. } => vertices,
            PolygonKind::Ring { .. } => &[],
        }
    }

    /// Any point on the polygon's plane.
    pub fn reference_point(&self) -> Vec3 {
        match &self.kind {
            PolygonKind::Triangle { vertices, .. } => vertices[0],
            PolygonKind::Quad { vertices, .. } => vertices[0],
            PolygonKind::Ring { center, .. } => *center,
        }
    }

    /// True when the segment moves away from, or parallel to, the front face.
    #[inline]
    pub fn has_wrong_direction(&self, direction: Vec3) -> bool {
        // Written so that NaN also rejects.
        !(direction.dot(self.normal) < 0.0)
    }

    /// True when both endpoints lie strictly outside the bounds on the same
    /// side of the same axis.
    #[inline]
    pub fn aside_hitbox(&self, start: Vec3, end: Vec3) -> bool {
        let min = self.bounds.min;
        let max = self.bounds.max;
        (0..3).any(|axis| {
            (start[axis] < min[axis] && end[axis] < min[axis])
                || (start[axis] > max[axis] && end[axis] > max[axis])
        })
    }

    /// Parameter `t` at which the segment's line meets the polygon's plane.
    #[inline]
    pub fn hit_scalar(&self, ray: &Ray) -> f32 {
        (self.reference_point() - ray.position).dot(self.normal) / ray.direction.dot(self.normal)
    }

    /// Whether a point on the polygon's plane lies inside it.
    pub fn encapsulates(&self, point: Vec3) -> bool {
        match &self.kind {
            PolygonKind::Triangle { edges, .. } => edges.iter().all(|e| e.contains(point)),
            PolygonKind::Quad { edges, .. } => edges.iter().all(|e| e.contains(point)),
            PolygonKind::Ring {
                center,
                radius_squared,
            } => point.distance_squared(*center) <= *radius_squared,
        }
    }

    /// Exact segment test. The result is in this polygon's local frame.
    pub fn intersect(&self, ray: &Ray) -> Option<LocalCollision> {
        if self.has_wrong_direction(ray.direction) {
            return None;
        }
        if self.aside_hitbox(ray.position, ray.end) {
            return None;
        }

        let t = self.hit_scalar(ray);
        if !(t > TIME_EPSILON && t <= 1.0) {
            return None;
        }

        let hit_position = ray.position + ray.direction * t;
        if !self.encapsulates(hit_position) {
            return None;
        }

        Some(LocalCollision {
            time_scalar: t,
            normal: self.normal,
            hit_position,
        })
    }
}
