//! Broadphase collision detection using incremental sweep-and-prune.
//!
//! Each axis keeps an array of slots ordered by lower bound. Motion between
//! ticks is small, so last tick's order is nearly sorted and an insertion
//! sort restores it in close to linear time. A sweep over each sorted axis
//! marks single-axis overlaps into a triangular bit matrix; a pair is a
//! candidate only when all three axis bits are set.

use std::collections::HashMap;

use crate::identity::EntityId;

use super::collider::PhysicsAabb;

pub const AXIS_X: u8 = 1 << 0;
pub const AXIS_Y: u8 = 1 << 1;
pub const AXIS_Z: u8 = 1 << 2;
pub const ALL_AXES: u8 = AXIS_X | AXIS_Y | AXIS_Z;

const AXIS_BITS: [u8; 3] = [AXIS_X, AXIS_Y, AXIS_Z];

/// Symmetric pairwise overlap matrix holding per-axis bits.
///
/// Only the strict lower triangle is stored; lookups accept either order and
/// the diagonal always reads as zero.
#[derive(Debug, Clone, Default)]
pub struct OverlapMatrix {
    len: usize,
    cells: Vec<u8>,
}

impl OverlapMatrix {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            cells: vec![0; len * len.saturating_sub(1) / 2],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn index(i: usize, j: usize) -> Option<usize> {
        let (hi, lo) = match i.cmp(&j) {
            std::cmp::Ordering::Greater => (i, j),
            std::cmp::Ordering::Less => (j, i),
            std::cmp::Ordering::Equal => return None,
        };
        Some(hi * (hi - 1) / 2 + lo)
    }

    /// Axis bits for the pair `(i, j)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u8 {
        Self::index(i, j).map_or(0, |idx| self.cells[idx])
    }

    #[inline]
    pub fn mark(&mut self, i: usize, j: usize, bits: u8) {
        if let Some(idx) = Self::index(i, j) {
            self.cells[idx] |= bits;
        }
    }

    #[inline]
    pub fn unmark(&mut self, i: usize, j: usize, bits: u8) {
        if let Some(idx) = Self::index(i, j) {
            self.cells[idx] &= !bits;
        }
    }

    /// Whether the pair overlaps on every axis.
    #[inline]
    pub fn is_candidate(&self, i: usize, j: usize) -> bool {
        self.get(i, j) == ALL_AXES
    }

    /// Clear every bit in row/column `slot`.
    pub fn clear_slot(&mut self, slot: usize) {
        for other in 0..self.len {
            if other != slot {
                self.unmark(slot, other, ALL_AXES);
            }
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// All candidate pairs `(low, high)` in ascending order.
    pub fn candidates(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for hi in 1..self.len {
            for lo in 0..hi {
                if self.cells[hi * (hi - 1) / 2 + lo] == ALL_AXES {
                    out.push((lo, hi));
                }
            }
        }
        out.sort_unstable();
        out
    }

    /// Candidate partners of a single slot, ascending.
    pub fn candidates_of(&self, slot: usize) -> Vec<usize> {
        (0..self.len)
            .filter(|&other| self.is_candidate(slot, other))
            .collect()
    }
}

/// Stable insertion sort of `order` by `key`, ties broken by slot index.
///
/// `O(n)` on nearly sorted input, `O(n^2)` worst case.
pub fn insertion_sort(order: &mut [usize], key: &[f32]) {
    let before = |a: usize, b: usize| key[a].total_cmp(&key[b]).then(a.cmp(&b)).is_lt();
    for i in 1..order.len() {
        let current = order[i];
        let mut j = i;
        while j > 0 && before(current, order[j - 1]) {
            order[j] = order[j - 1];
            j -= 1;
        }
        order[j] = current;
    }
}

/// Sweep one lower-bound-sorted axis and mark every strictly overlapping pair.
///
/// For each slot the scan runs forward while the next lower bound is below
/// this slot's upper bound. Inactive slots are skipped.
pub fn check_overlap(
    order: &[usize],
    lower: &[f32],
    upper: &[f32],
    active: &[bool],
    matrix: &mut OverlapMatrix,
    axis_bit: u8,
) {
    for (pos, &i) in order.iter().enumerate() {
        if !active[i] {
            continue;
        }
        for &k in &order[pos + 1..] {
            if lower[k] >= upper[i] {
                break;
            }
            if active[k] && lower[i] < upper[k] {
                matrix.mark(i, k, axis_bit);
            }
        }
    }
}

/// Reference `O(n^2)` overlap check along one axis.
pub fn naive_overlap(lower: &[f32], upper: &[f32], matrix: &mut OverlapMatrix, axis_bit: u8) {
    for i in 0..lower.len() {
        for j in (i + 1)..lower.len() {
            if lower[i] < upper[j] && lower[j] < upper[i] {
                matrix.mark(i, j, axis_bit);
            }
        }
    }
}

#[derive(Debug, Default)]
struct AxisList {
    order: Vec<usize>,
    lower: Vec<f32>,
    upper: Vec<f32>,
}

/// Incremental sweep-and-prune broad phase.
///
/// Slots are per-tick indices assigned by the caller. The sorted order per
/// axis is remembered across ticks as entity ids and only used to seed the
/// next tick's insertion sort.
#[derive(Debug, Default)]
pub struct SweepAndPrune {
    axes: [AxisList; 3],
    active: Vec<bool>,
    matrix: OverlapMatrix,
    hint: [Vec<EntityId>; 3],
    ids: Vec<EntityId>,
}

impl SweepAndPrune {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load this tick's extents (slot `i` belongs to `ids[i]`), sort each axis
    /// starting from last tick's order, and rebuild the overlap matrix.
    pub fn begin(&mut self, ids: &[EntityId], extents: &[PhysicsAabb]) {
        debug_assert_eq!(ids.len(), extents.len());
        let n = ids.len();
        self.ids = ids.to_vec();
        self.active = vec![true; n];
        self.matrix = OverlapMatrix::new(n);

        let slot_of: HashMap<EntityId, usize> =
            ids.iter().enumerate().map(|(slot, id)| (*id, slot)).collect();

        for (axis, list) in self.axes.iter_mut().enumerate() {
            list.lower = extents.iter().map(|e| e.min[axis]).collect();
            list.upper = extents.iter().map(|e| e.max[axis]).collect();

            let mut seen = vec![false; n];
            list.order.clear();
            for id in &self.hint[axis] {
                if let Some(&slot) = slot_of.get(id) {
                    if !seen[slot] {
                        seen[slot] = true;
                        list.order.push(slot);
                    }
                }
            }
            list.order.extend((0..n).filter(|slot| !seen[*slot]));

            insertion_sort(&mut list.order, &list.lower);
            check_overlap(
                &list.order,
                &list.lower,
                &list.upper,
                &self.active,
                &mut self.matrix,
                AXIS_BITS[axis],
            );
        }
    }

    /// Replace one slot's extent, restore the sort and rescan that slot.
    pub fn update(&mut self, slot: usize, extent: PhysicsAabb) {
        if !self.active.get(slot).copied().unwrap_or(false) {
            return;
        }
        self.matrix.clear_slot(slot);
        for (axis, list) in self.axes.iter_mut().enumerate() {
            list.lower[slot] = extent.min[axis];
            list.upper[slot] = extent.max[axis];
            insertion_sort(&mut list.order, &list.lower);
            Self::rescan_slot(list, &self.active, &mut self.matrix, slot, AXIS_BITS[axis]);
        }
    }

    fn rescan_slot(
        list: &AxisList,
        active: &[bool],
        matrix: &mut OverlapMatrix,
        slot: usize,
        axis_bit: u8,
    ) {
        let Some(pos) = list.order.iter().position(|&s| s == slot) else {
            return;
        };
        let (lo, hi) = (list.lower[slot], list.upper[slot]);

        // Earlier slots can reach arbitrarily far right, so scan all of them.
        for &k in &list.order[..pos] {
            if active[k] && list.lower[k] < hi && lo < list.upper[k] {
                matrix.mark(slot, k, axis_bit);
            }
        }
        for &k in &list.order[pos + 1..] {
            if list.lower[k] >= hi {
                break;
            }
            if active[k] && lo < list.upper[k] {
                matrix.mark(slot, k, axis_bit);
            }
        }
    }

    /// Drop a slot for the rest of the tick; its rows and columns are cleared.
    pub fn remove(&mut self, slot: usize) {
        if let Some(flag) = self.active.get_mut(slot) {
            *flag = false;
            self.matrix.clear_slot(slot);
        }
    }

    pub fn is_active(&self, slot: usize) -> bool {
        self.active.get(slot).copied().unwrap_or(false)
    }

    pub fn matrix(&self) -> &OverlapMatrix {
        &self.matrix
    }

    pub fn candidates(&self) -> Vec<(usize, usize)> {
        self.matrix.candidates()
    }

    pub fn candidates_of(&self, slot: usize) -> Vec<usize> {
        self.matrix.candidates_of(slot)
    }

    /// Remember the current per-axis order for the next tick.
    pub fn finish(&mut self) {
        for (axis, list) in self.axes.iter().enumerate() {
            self.hint[axis] = list
                .order
                .iter()
                .filter(|&&slot| self.active[slot])
                .map(|&slot| self.ids[slot])
                .collect();
        }
    }

    /// Slots in sorted order along `axis` (0 = x, 1 = y, 2 = z).
    pub fn order(&self, axis: usize) -> &[usize] {
        &self.axes[axis].order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn cube(center: Vec3, half: f32) -> PhysicsAabb {
        PhysicsAabb {
            min: center - Vec3::splat(half),
            max: center + Vec3::splat(half),
        }
    }

    fn ids(n: u64) -> Vec<EntityId> {
        (0..n).map(EntityId::from_raw).collect()
    }

    #[test]
    fn test_single_axis_reference_scenario() {
        // Slot i has its z center at z[i].
        let z = [3.5, -1.5, 3.0, -2.0];
        let lower: Vec<f32> = z.iter().map(|c| c - 0.5).collect();
        let upper: Vec<f32> = z.iter().map(|c| c + 0.5).collect();
        let mut order: Vec<usize> = (0..4).collect();
        insertion_sort(&mut order, &lower);
        assert_eq!(order, vec![3, 1, 2, 0]);

        let mut matrix = OverlapMatrix::new(4);
        check_overlap(&order, &lower, &upper, &[true; 4], &mut matrix, AXIS_Z);

        assert_eq!(matrix.get(1, 0), 0);
        assert_eq!(matrix.get(2, 0), AXIS_Z);
        assert_eq!(matrix.get(2, 1), 0);
        assert_eq!(matrix.get(3, 0), 0);
        assert_eq!(matrix.get(3, 1), AXIS_Z);
        assert_eq!(matrix.get(3, 2), 0);
        // Symmetric lookups.
        assert_eq!(matrix.get(0, 2), AXIS_Z);
        assert_eq!(matrix.get(1, 3), AXIS_Z);
    }

    #[test]
    fn test_diagonal_is_never_marked() {
        let mut matrix = OverlapMatrix::new(3);
        matrix.mark(1, 1, ALL_AXES);
        assert_eq!(matrix.get(1, 1), 0);
        assert!(matrix.candidates().is_empty());
    }

    #[test]
    fn test_all_three_axes_required() {
        let extents = [
            cube(Vec3::ZERO, 1.0),
            // Overlaps on x and y, separated on z.
            cube(Vec3::new(0.5, 0.5, 5.0), 1.0),
            // Overlaps on every axis.
            cube(Vec3::new(0.5, 0.5, 0.5), 1.0),
        ];
        let mut sap = SweepAndPrune::new();
        sap.begin(&ids(3), &extents);

        assert_eq!(sap.matrix().get(0, 1), AXIS_X | AXIS_Y);
        assert!(!sap.matrix().is_candidate(0, 1));
        assert!(sap.matrix().is_candidate(0, 2));
        assert_eq!(sap.candidates(), vec![(0, 2)]);
    }

    #[test]
    fn test_update_and_remove() {
        let extents = [
            cube(Vec3::ZERO, 1.0),
            cube(Vec3::new(10.0, 0.0, 0.0), 1.0),
            cube(Vec3::new(20.0, 0.0, 0.0), 1.0),
        ];
        let mut sap = SweepAndPrune::new();
        sap.begin(&ids(3), &extents);
        assert!(sap.candidates().is_empty());

        sap.update(2, cube(Vec3::new(0.5, 0.0, 0.0), 1.0));
        assert_eq!(sap.candidates(), vec![(0, 2)]);
        assert_eq!(sap.order(0), &[0, 2, 1]);

        sap.remove(0);
        assert!(sap.candidates().is_empty());
        assert!(!sap.is_active(0));

        // Removed slots stay out even when something moves onto them.
        sap.update(1, cube(Vec3::ZERO, 1.0));
        assert_eq!(sap.candidates(), vec![(1, 2)]);
    }

    #[test]
    fn test_order_hint_survives_ticks() {
        let mut sap = SweepAndPrune::new();
        let a = [
            cube(Vec3::new(5.0, 0.0, 0.0), 1.0),
            cube(Vec3::new(-5.0, 0.0, 0.0), 1.0),
        ];
        sap.begin(&ids(2), &a);
        assert_eq!(sap.order(0), &[1, 0]);
        sap.finish();

        // Next tick the same entities arrive in different slots plus a newcomer.
        let next_ids = vec![
            EntityId::from_raw(7),
            EntityId::from_raw(0),
            EntityId::from_raw(1),
        ];
        let b = [
            cube(Vec3::new(0.0, 0.0, 0.0), 1.0),
            cube(Vec3::new(5.5, 0.0, 0.0), 1.0),
            cube(Vec3::new(-4.5, 0.0, 0.0), 1.0),
        ];
        sap.begin(&next_ids, &b);
        assert_eq!(sap.order(0), &[2, 0, 1]);
    }

    #[test]
    fn test_sweep_matches_naive_on_grid() {
        let mut extents = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                extents.push(cube(
                    Vec3::new(i as f32 * 1.5, (i + j) as f32 * 0.3, j as f32 * 1.5),
                    1.0,
                ));
            }
        }
        let n = extents.len();
        let mut sap = SweepAndPrune::new();
        sap.begin(&ids(n as u64), &extents);

        let mut naive = OverlapMatrix::new(n);
        for (axis, bit) in AXIS_BITS.iter().enumerate() {
            let lower: Vec<f32> = extents.iter().map(|e| e.min[axis]).collect();
            let upper: Vec<f32> = extents.iter().map(|e| e.max[axis]).collect();
            naive_overlap(&lower, &upper, &mut naive, *bit);
        }
        for i in 0..n {
            for j in 0..n {
                assert_eq!(sap.matrix().get(i, j), naive.get(i, j), "pair ({i}, {j})");
            }
        }
        assert_eq!(sap.candidates(), naive.candidates());
    }
}
