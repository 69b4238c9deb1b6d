//! Event-ordered collision resolution within one tick.
//!
//! The loop repeatedly takes the single earliest pending contact, delivers it
//! to both participants, re-bases them at the contact time, refreshes their
//! extents in the broad phase and re-tests only the pairs they are part of.
//! It stops when nothing is pending or the iteration budget is spent; in the
//! latter case any remaining interpenetration is left for the next tick.
//!
//! A pair yields at most one contact per instant. When several vertices or
//! edges of the same pair touch simultaneously, responses see one of them.

use std::collections::BTreeMap;

use glam::Vec3;
use tracing::{debug, trace};

use super::broadphase::SweepAndPrune;
use super::contact::{Collision, PairHit};
use super::narrowphase::detect_collision;
use super::rigid_body::SweptBody;

/// Why the loop reached its DONE state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// No contact remains this tick.
    Exhausted,
    /// The per-tick iteration budget ran out.
    BudgetReached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationReport {
    pub iterations: u32,
    pub collisions: u32,
    /// Slots of bodies destroyed during the tick, in destruction order.
    pub destroyed: Vec<usize>,
    pub reason: DoneReason,
}

/// Run the collision iteration loop over `bodies`.
///
/// `deliver(body, collision, source_is_sensor)` applies one side of a
/// contact; it may change `body.velocity` and returns `true` when the body
/// was destroyed. It is called with the body already re-based at the contact
/// time.
pub fn resolve_collisions<F>(
    bodies: &mut [SweptBody],
    broadphase: &mut SweepAndPrune,
    max_iterations: u32,
    mut deliver: F,
) -> IterationReport
where
    F: FnMut(&mut SweptBody, &Collision, bool) -> bool,
{
    let ids: Vec<_> = bodies.iter().map(|b| b.id).collect();
    let extents: Vec<_> = bodies.iter().map(SweptBody::swept_extent).collect();
    broadphase.begin(&ids, &extents);
    for (slot, body) in bodies.iter().enumerate() {
        if !body.active {
            broadphase.remove(slot);
        }
    }

    let mut pending: BTreeMap<(usize, usize), PairHit> = BTreeMap::new();
    for (a, b) in broadphase.candidates() {
        test_pair(bodies, a, b, 0.0, &mut pending);
    }

    let mut iterations = 0u32;
    let mut collisions = 0u32;
    let mut destroyed = Vec::new();

    let reason = loop {
        let Some((a, b, hit)) = earliest(&pending, bodies) else {
            break DoneReason::Exhausted;
        };
        if iterations >= max_iterations {
            debug!(
                iterations,
                pending = pending.len(),
                "collision budget exhausted, leaving the rest for next tick"
            );
            break DoneReason::BudgetReached;
        }
        iterations += 1;
        pending.remove(&(a, b));

        let now = hit.time_scalar;
        trace!(
            a = %bodies[a].id,
            b = %bodies[b].id,
            time = now,
            "collision"
        );

        let mut changed = [false; 2];
        for (i, (slot, other, collision)) in
            [(a, b, hit.first), (b, a, hit.second)].into_iter().enumerate()
        {
            let source_is_sensor = bodies[other].sensor;
            let body = &mut bodies[slot];
            body.rebase(now);
            let before = body.velocity;
            let was_destroyed = deliver(body, &collision, source_is_sensor);
            if !body.movable {
                body.velocity = Vec3::ZERO;
            }
            if was_destroyed {
                body.active = false;
                destroyed.push(slot);
            }
            changed[i] = was_destroyed || body.velocity != before;
        }
        collisions += 1;

        // A body whose path is unchanged keeps its cached hits: they are in
        // tick time and still lie ahead of `now`.
        for (slot, _) in [a, b].into_iter().zip(changed).filter(|(_, c)| *c) {
            pending.retain(|&(x, y), _| x != slot && y != slot);
            if bodies[slot].active {
                broadphase.update(slot, bodies[slot].swept_extent());
            } else {
                broadphase.remove(slot);
            }
        }

        for (slot, _) in [a, b].into_iter().zip(changed).filter(|(_, c)| *c) {
            if !bodies[slot].active {
                continue;
            }
            for other in broadphase.candidates_of(slot) {
                // The shared pair was already re-tested from `a`'s side.
                if slot == b && other == a && changed[0] {
                    continue;
                }
                test_pair(bodies, slot.min(other), slot.max(other), now, &mut pending);
            }
        }
        if changed == [false, false] {
            // Pass-through contact; later vertices of the same pair may still hit.
            // Other features of this pair touching at this same instant are
            // not delivered separately: hits must lie strictly after `now`.
            test_pair(bodies, a, b, now, &mut pending);
        }
    };

    IterationReport {
        iterations,
        collisions,
        destroyed,
        reason,
    }
}

fn test_pair(
    bodies: &[SweptBody],
    a: usize,
    b: usize,
    now: f32,
    pending: &mut BTreeMap<(usize, usize), PairHit>,
) {
    let (body_a, body_b) = (&bodies[a], &bodies[b]);
    if !body_a.active || !body_b.active {
        return;
    }
    if let Some(hit) = detect_collision(body_a, body_b, now) {
        pending.insert((a, b), hit);
    }
}

/// Earliest pending hit; ties go to the lower entity ids.
fn earliest(
    pending: &BTreeMap<(usize, usize), PairHit>,
    bodies: &[SweptBody],
) -> Option<(usize, usize, PairHit)> {
    let key = |a: usize, b: usize| {
        let (x, y) = (bodies[a].id, bodies[b].id);
        if x < y {
            (x, y)
        } else {
            (y, x)
        }
    };
    pending
        .iter()
        .min_by(|(&(a1, b1), h1), (&(a2, b2), h2)| {
            h1.time_scalar
                .total_cmp(&h2.time_scalar)
                .then_with(|| key(a1, b1).cmp(&key(a2, b2)))
        })
        .map(|(&(a, b), hit)| (a, b, *hit))
}
