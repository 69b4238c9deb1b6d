//! Collider shapes and bounding extents for collision detection.

use glam::Vec3;

use crate::ecs::components::transform::Transform;

use super::polygon::Polygon;

/// Axis-aligned bounding box for broadphase collision detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsAabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl PhysicsAabb {
    /// Degenerate box around a single point.
    pub fn point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest box containing every point. Empty input yields a box at the origin.
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some((first, rest)) = points.split_first() else {
            return Self::point(Vec3::ZERO);
        };
        rest.iter().fold(Self::point(*first), |aabb, p| PhysicsAabb {
            min: aabb.min.min(*p),
            max: aabb.max.max(*p),
        })
    }

    pub fn union(&self, other: &PhysicsAabb) -> PhysicsAabb {
        PhysicsAabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// World-space box of this local box under `transform` (all 8 corners).
    pub fn transformed(&self, transform: &Transform) -> PhysicsAabb {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
        .map(|c| transform.transform_point(c));
        PhysicsAabb::from_points(&corners)
    }

    /// Test whether two AABBs overlap (strict, touching faces do not count).
    #[inline]
    pub fn overlaps(&self, other: &PhysicsAabb) -> bool {
        (0..3).all(|axis| self.overlaps_on(other, axis))
    }

    /// Strict interval overlap along one axis.
    #[inline]
    pub fn overlaps_on(&self, other: &PhysicsAabb, axis: usize) -> bool {
        self.min[axis] < other.max[axis] && other.min[axis] < self.max[axis]
    }
}

/// Ordered set of convex polygons with the vertices used as swept points
/// and the edges used for edge-against-edge sweeps.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    polygons: Vec<Polygon>,
    vertices: Vec<Vec3>,
    edges: Vec<[Vec3; 2]>,
    bounds: PhysicsAabb,
}

impl Shape {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        let mut vertices: Vec<Vec3> = Vec::new();
        let mut edges: Vec<[Vec3; 2]> = Vec::new();
        let mut corners: Vec<Vec3> = Vec::new();
        for polygon in &polygons {
            let ring = polygon.vertices();
            for (i, v) in ring.iter().enumerate() {
                if !vertices.iter().any(|known| known.abs_diff_eq(*v, 1e-6)) {
                    vertices.push(*v);
                }
                // Faces sharing an edge list it in opposite winding.
                let w = ring[(i + 1) % ring.len()];
                let shared = edges.iter().any(|[p, q]| {
                    (p.abs_diff_eq(*v, 1e-6) && q.abs_diff_eq(w, 1e-6))
                        || (p.abs_diff_eq(w, 1e-6) && q.abs_diff_eq(*v, 1e-6))
                });
                if !shared {
                    edges.push([*v, w]);
                }
            }
            corners.push(polygon.bounds().min);
            corners.push(polygon.bounds().max);
        }
        let bounds = PhysicsAabb::from_points(&corners);
        Self {
            polygons,
            vertices,
            edges,
            bounds,
        }
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Unique polygon edges as endpoint pairs.
    pub fn edges(&self) -> &[[Vec3; 2]] {
        &self.edges
    }

    /// Local-frame bounds of every polygon.
    pub fn bounds(&self) -> &PhysicsAabb {
        &self.bounds
    }
}

/// Collision geometry carried by a touchable entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Collider {
    /// Union of convex polygons.
    Polygons(Shape),
    /// A swept point, for small fast bodies.
    Point,
}

impl Collider {
    /// Closed box of six outward-facing quads.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        // (center, u, v) with u x v along the outward normal.
        let faces = [
            (Vec3::X * h.x, Vec3::Y * h.y, Vec3::Z * h.z),
            (-Vec3::X * h.x, Vec3::Z * h.z, Vec3::Y * h.y),
            (Vec3::Y * h.y, Vec3::Z * h.z, Vec3::X * h.x),
            (-Vec3::Y * h.y, Vec3::X * h.x, Vec3::Z * h.z),
            (Vec3::Z * h.z, Vec3::X * h.x, Vec3::Y * h.y),
            (-Vec3::Z * h.z, Vec3::Y * h.y, Vec3::X * h.x),
        ];
        let polygons = faces
            .iter()
            .map(|&(c, u, v)| Polygon::quad(c - u - v, c + u - v, c + u + v, c - u + v))
            .collect();
        Collider::Polygons(Shape::new(polygons))
    }

    /// Regular tetrahedron with vertices at distance `radius` from the origin.
    pub fn tetrahedron(radius: f32) -> Self {
        let s = radius / 3f32.sqrt();
        let p = [
            Vec3::new(s, s, s),
            Vec3::new(s, -s, -s),
            Vec3::new(-s, s, -s),
            Vec3::new(-s, -s, s),
        ];
        let polygons = vec![
            Polygon::triangle_facing_away(p[0], p[1], p[2], Vec3::ZERO),
            Polygon::triangle_facing_away(p[0], p[1], p[3], Vec3::ZERO),
            Polygon::triangle_facing_away(p[0], p[2], p[3], Vec3::ZERO),
            Polygon::triangle_facing_away(p[1], p[2], p[3], Vec3::ZERO),
        ];
        Collider::Polygons(Shape::new(polygons))
    }

    /// Two-sided gate: a ring facing +Z and one facing -Z.
    pub fn ring(radius: f32) -> Self {
        Collider::Polygons(Shape::new(vec![
            Polygon::ring(Vec3::ZERO, Vec3::Z, radius),
            Polygon::ring(Vec3::ZERO, -Vec3::Z, radius),
        ]))
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Collider::Point)
    }

    pub fn polygons(&self) -> &[Polygon] {
        match self {
            Collider::Polygons(shape) => shape.polygons(),
            Collider::Point => &[],
        }
    }

    /// Points swept against the other body's polygons.
    pub fn swept_points(&self) -> &[Vec3] {
        const ORIGIN: [Vec3; 1] = [Vec3::ZERO];
        match self {
            Collider::Polygons(shape) => shape.vertices(),
            Collider::Point => &ORIGIN,
        }
    }

    /// Edges swept against the other body's edges; empty for points.
    pub fn edges(&self) -> &[[Vec3; 2]] {
        match self {
            Collider::Polygons(shape) => shape.edges(),
            Collider::Point => &[],
        }
    }

    /// Compute the world-space AABB for this collider.
    pub fn compute_aabb(&self, transform: &Transform) -> PhysicsAabb {
        match self {
            Collider::Polygons(shape) => shape.bounds().transformed(transform),
            Collider::Point => PhysicsAabb::point(transform.position),
        }
    }

    /// Extent covering the collider at `start` and at `end`, i.e. the whole
    /// swept volume of a linear motion between the two.
    pub fn swept_aabb(&self, start: &Transform, end: &Transform) -> PhysicsAabb {
        self.compute_aabb(start).union(&self.compute_aabb(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_cuboid_aabb() {
        let collider = Collider::cuboid(Vec3::new(1.0, 2.0, 3.0));
        let aabb = collider.compute_aabb(&Transform::identity());

        let eps = 1e-5;
        assert!((aabb.min - Vec3::new(-1.0, -2.0, -3.0)).length() < eps);
        assert!((aabb.max - Vec3::new(1.0, 2.0, 3.0)).length() < eps);
    }

    #[test]
    fn test_cuboid_faces_point_outward() {
        let collider = Collider::cuboid(Vec3::splat(1.0));
        assert_eq!(collider.polygons().len(), 6);
        assert_eq!(collider.swept_points().len(), 8);
        for polygon in collider.polygons() {
            let centroid = polygon.vertices().iter().copied().sum::<Vec3>() / 4.0;
            assert!(
                polygon.normal().dot(centroid) > 0.0,
                "face at {centroid:?} faces inward"
            );
        }
    }

    #[test]
    fn test_shared_edges_listed_once() {
        assert_eq!(Collider::cuboid(Vec3::splat(1.0)).edges().len(), 12);
        assert_eq!(Collider::tetrahedron(2.0).edges().len(), 6);
        assert!(Collider::ring(5.0).edges().is_empty());
        assert!(Collider::Point.edges().is_empty());
    }

    #[test]
    fn test_tetrahedron_faces_point_outward() {
        let collider = Collider::tetrahedron(2.0);
        assert_eq!(collider.swept_points().len(), 4);
        for polygon in collider.polygons() {
            assert!(polygon.normal().dot(polygon.reference_point()) > 0.0);
        }
    }

    #[test]
    fn test_rotated_aabb_grows() {
        let collider = Collider::cuboid(Vec3::new(2.0, 0.5, 0.5));
        let transform = Transform::from_position_rotation(
            Vec3::ZERO,
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_4),
        );
        let aabb = collider.compute_aabb(&transform);
        assert!(aabb.max.y > 1.0);
    }

    #[test]
    fn test_swept_aabb_covers_motion() {
        let collider = Collider::cuboid(Vec3::splat(1.0));
        let start = Transform::identity();
        let end = Transform::from_position(Vec3::new(10.0, 0.0, 0.0));
        let swept = collider.swept_aabb(&start, &end);

        assert_eq!(swept.min.to_array(), [-1.0, -1.0, -1.0]);
        assert_eq!(swept.max.to_array(), [11.0, 1.0, 1.0]);
    }

    #[test]
    fn test_point_swept_aabb_is_segment_box() {
        let start = Transform::from_position(Vec3::new(0.0, 1.0, 0.0));
        let end = Transform::from_position(Vec3::new(0.0, 1.0, -5.0));
        let swept = Collider::Point.swept_aabb(&start, &end);
        assert_eq!(swept.min, Vec3::new(0.0, 1.0, -5.0));
        assert_eq!(swept.max, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_aabb_overlap() {
        let a = PhysicsAabb {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        let b = PhysicsAabb {
            min: Vec3::new(0.5, 0.5, 0.5),
            max: Vec3::new(2.0, 2.0, 2.0),
        };
        let c = PhysicsAabb {
            min: Vec3::new(2.0, 2.0, 2.0),
            max: Vec3::new(3.0, 3.0, 3.0),
        };
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        // Touching faces are not an overlap.
        assert!(!b.overlaps(&c));
    }
}
