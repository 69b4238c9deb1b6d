//! Atomically published, read-only views of the committed world.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::identity::EntityId;
use crate::spawn::EntityKind;

use super::EntityState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotEntry {
    pub id: EntityId,
    pub kind: EntityKind,
    pub state: EntityState,
}

/// Every entity's state as of one tick commit. Never mutated once built.
#[derive(Debug, Clone)]
pub struct Snapshot {
    tick: u64,
    tick_duration: Duration,
    committed_at: Instant,
    /// Sorted by id.
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn new(
        tick: u64,
        tick_duration: Duration,
        committed_at: Instant,
        mut entries: Vec<SnapshotEntry>,
    ) -> Self {
        entries.sort_unstable_by_key(|e| e.id);
        Self {
            tick,
            tick_duration,
            committed_at,
            entries,
        }
    }

    /// Nothing committed yet.
    pub fn empty(tick_duration: Duration) -> Self {
        Self::new(0, tick_duration, Instant::now(), Vec::new())
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn committed_at(&self) -> Instant {
        self.committed_at
    }

    pub fn get(&self, id: EntityId) -> Option<&SnapshotEntry> {
        self.entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Single-writer publication point. Readers clone the current `Arc` and
/// never see a half-committed tick.
#[derive(Debug)]
pub struct SnapshotCell {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotCell {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn publish(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    pub fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn view(&self) -> WorldView {
        WorldView::new(self.load())
    }
}

/// Read-only query surface, consistent as of the last committed tick.
#[derive(Debug, Clone)]
pub struct WorldView {
    snapshot: Arc<Snapshot>,
}

impl WorldView {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }

    pub fn entity(&self, id: EntityId) -> Option<&SnapshotEntry> {
        self.snapshot.get(id)
    }

    pub fn state(&self, id: EntityId) -> Option<EntityState> {
        self.entity(id).map(|e| e.state)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.snapshot.iter()
    }

    /// Entities of one kind.
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &SnapshotEntry> {
        self.iter().filter(move |e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    pub fn tick(&self) -> u64 {
        self.snapshot.tick()
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn entry(id: u64, kind: EntityKind) -> SnapshotEntry {
        SnapshotEntry {
            id: EntityId::from_raw(id),
            kind,
            state: EntityState::fixed(Vec3::splat(id as f32), Quat::IDENTITY),
        }
    }

    #[test]
    fn test_snapshot_lookup_by_id() {
        let snapshot = Snapshot::new(
            3,
            Duration::from_millis(50),
            Instant::now(),
            vec![
                entry(7, EntityKind::Asteroid),
                entry(2, EntityKind::Fighter),
                entry(5, EntityKind::Bullet),
            ],
        );
        assert_eq!(snapshot.len(), 3);
        let ids: Vec<u64> = snapshot.iter().map(|e| e.id.raw()).collect();
        assert_eq!(ids, vec![2, 5, 7]);
        assert_eq!(snapshot.get(EntityId::from_raw(5)).unwrap().kind, EntityKind::Bullet);
        assert!(snapshot.get(EntityId::from_raw(6)).is_none());
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let cell = SnapshotCell::new(Snapshot::empty(Duration::from_millis(50)));
        let before = cell.view();
        assert!(before.is_empty());

        cell.publish(Snapshot::new(
            1,
            Duration::from_millis(50),
            Instant::now(),
            vec![entry(1, EntityKind::Fighter)],
        ));

        assert!(before.is_empty());
        assert_eq!(before.tick(), 0);
        let after = cell.view();
        assert_eq!(after.tick(), 1);
        assert_eq!(
            after.state(EntityId::from_raw(1)).map(|s| s.position(0.5)),
            Some(Vec3::ONE)
        );
        assert_eq!(after.of_kind(EntityKind::Fighter).count(), 1);
        assert_eq!(after.of_kind(EntityKind::Missile).count(), 0);
    }
}
