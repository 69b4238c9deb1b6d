//! Narrowphase collision detection: swept points against convex polygons.
//!
//! A pair is tested in the struck body's local frame using the relative
//! displacement of the other body, in both directions: the vertices of `a`
//! against the polygons of `b`, and the vertices of `b` against the polygons
//! of `a`. Point colliders contribute a single swept point and have no
//! polygons to be struck.
//!
//! Convex bodies can also meet edge to edge with no vertex entering a face
//! (two bars crossing at right angles), so every edge of `a` is additionally
//! swept as a parallelogram against every edge of `b`.

use glam::Vec3;

use super::contact::{Collision, LocalCollision, PairHit};
use super::polygon::{Ray, TIME_EPSILON};
use super::rigid_body::SweptBody;

/// Earliest hit of `mover`'s swept points on `target`'s polygons, for the
/// remainder of the tick starting at global time `from`.
///
/// The returned collision is addressed to `mover`: its normal is the struck
/// face's world normal and its source is `target`.
pub fn sweep_points(mover: &SweptBody, target: &SweptBody, from: f32) -> Option<Collision> {
    let polygons = target.collider.polygons();
    if polygons.is_empty() {
        return None;
    }

    let remaining = 1.0 - from;
    let relative = (mover.displacement() - target.displacement()) * remaining;
    let target_start = target.transform_at(from);
    let local_direction = target_start.inverse_transform_vector(relative);
    let mover_start = mover.transform_at(from);

    let mut best: Option<LocalCollision> = None;
    for point in mover.collider.swept_points() {
        let world_start = mover_start.transform_point(*point);
        let ray = Ray::new(target_start.inverse_transform_point(world_start), local_direction);
        for polygon in polygons {
            if let Some(hit) = polygon.intersect(&ray) {
                if best
                    .as_ref()
                    .map_or(true, |b| hit.time_scalar < b.time_scalar)
                {
                    best = Some(hit);
                }
            }
        }
    }

    let local = best?;
    let time_scalar = from + local.time_scalar * remaining;
    let collision = local.into_world(&target.transform_at(time_scalar), target.id);
    Some(Collision {
        time_scalar,
        ..collision
    })
}

/// Earliest crossing of one of `mover`'s edges with one of `target`'s edges,
/// addressed to `mover` like [`sweep_points`].
pub fn sweep_edges(mover: &SweptBody, target: &SweptBody, from: f32) -> Option<Collision> {
    let (edges, targets) = (mover.collider.edges(), target.collider.edges());
    if edges.is_empty() || targets.is_empty() {
        return None;
    }

    let remaining = 1.0 - from;
    let relative = (mover.displacement() - target.displacement()) * remaining;
    let target_start = target.transform_at(from);
    let d = target_start.inverse_transform_vector(relative);
    let mover_start = mover.transform_at(from);
    let to_local = |p: Vec3| target_start.inverse_transform_point(mover_start.transform_point(p));

    let mut best: Option<LocalCollision> = None;
    for &[p0, p1] in edges {
        let (p0, p1) = (to_local(p0), to_local(p1));
        for &[q0, q1] in targets {
            let Some(hit) = edge_crossing(p0, p1 - p0, d, q0, q1 - q0) else {
                continue;
            };
            if best
                .as_ref()
                .map_or(true, |b| hit.time_scalar < b.time_scalar)
            {
                best = Some(hit);
            }
        }
    }

    let local = best?;
    let time_scalar = from + local.time_scalar * remaining;
    let collision = local.into_world(&target.transform_at(time_scalar), target.id);
    Some(Collision {
        time_scalar,
        ..collision
    })
}

/// Solve `p0 + s*e + t*d = q0 + u*f` for the parallelogram swept by edge
/// `(p0, e)` along `d` meeting edge `(q0, f)`, with `s, u` in [0, 1].
///
/// The normal is `e x f`, flipped to oppose the motion.
fn edge_crossing(p0: Vec3, e: Vec3, d: Vec3, q0: Vec3, f: Vec3) -> Option<LocalCollision> {
    let w = q0 - p0;
    let det = e.dot(d.cross(-f));
    let scale = e.length() * d.length() * f.length();
    // Parallel edges, or an edge lying along the motion: the vertex sweeps
    // cover those.
    if !(det.abs() > scale * 1e-5) {
        return None;
    }

    let s = w.dot(d.cross(-f)) / det;
    let t = e.dot(w.cross(-f)) / det;
    let u = e.dot(d.cross(w)) / det;
    let on_edges = (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&u);
    if !(t > TIME_EPSILON && t <= 1.0) || !on_edges {
        return None;
    }

    let normal = e.cross(f);
    Some(LocalCollision {
        time_scalar: t,
        normal: if normal.dot(d) > 0.0 { -normal } else { normal },
        hit_position: q0 + f * u,
    })
}

/// Find the earliest contact between two bodies after global time `from`.
pub fn detect_collision(a: &SweptBody, b: &SweptBody, from: f32) -> Option<PairHit> {
    if a.collider.is_point() && b.collider.is_point() {
        return None;
    }
    if a.is_static() && b.is_static() {
        return None;
    }

    let a_hits_b = match (sweep_points(a, b, from), sweep_edges(a, b, from)) {
        (Some(point), Some(edge)) => Collision::earliest(Some(point), edge),
        (point, edge) => point.or(edge),
    };
    let b_hits_a = sweep_points(b, a, from);

    match (a_hits_b, b_hits_a) {
        (Some(ab), Some(ba)) if ba.cmp_time(&ab).is_lt() => Some(PairHit {
            time_scalar: ba.time_scalar,
            first: ba.mirrored(b.id),
            second: ba,
        }),
        (Some(ab), _) => Some(PairHit {
            time_scalar: ab.time_scalar,
            first: ab,
            second: ab.mirrored(a.id),
        }),
        (None, Some(ba)) => Some(PairHit {
            time_scalar: ba.time_scalar,
            first: ba.mirrored(b.id),
            second: ba,
        }),
        (None, None) => None,
    }
}
