//! Process-wide entity identity allocation.
//!
//! Ids start at 1 and are never reused. `0` is reserved as the "no entity"
//! sentinel. The allocator is an explicit object owned by the simulation and
//! shared with spawners through an `Arc`, so producers on any thread can
//! allocate before handing the spawn to the simulation thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use thiserror::Error;

/// Unique, process-wide entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// Sentinel meaning "no entity".
    pub const NONE: EntityId = EntityId(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised by [`IdentityAllocator`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// Allocation was disabled (e.g. during shutdown).
    #[error("identity allocation is disabled")]
    Disabled,
    /// The id space is used up; handing out another id would wrap.
    #[error("entity id space exhausted")]
    Exhausted,
}

/// Monotonic id generator. Increments are a single atomic compare-exchange
/// loop that refuses to wrap past `u64::MAX`.
#[derive(Debug)]
pub struct IdentityAllocator {
    next: AtomicU64,
    enabled: AtomicBool,
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create an allocator whose first id is `first` (clamped to at least 1).
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first.max(1)),
            enabled: AtomicBool::new(true),
        }
    }

    /// Allocate the next id.
    pub fn allocate(&self) -> Result<EntityId, IdentityError> {
        if !self.enabled.load(Ordering::Acquire) {
            return Err(IdentityError::Disabled);
        }
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| next.checked_add(1))
            .map(EntityId)
            .map_err(|_| IdentityError::Exhausted)
    }

    /// Make every further [`allocate`](Self::allocate) call fail fast.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Ensure ids received from a remote authority are never handed out
    /// locally: the counter is bumped past `id` if needed.
    ///
    /// Fails with [`IdentityError::Exhausted`] for `u64::MAX`, which the
    /// counter cannot move past.
    pub fn reserve(&self, id: EntityId) -> Result<(), IdentityError> {
        let past = id.0.checked_add(1).ok_or(IdentityError::Exhausted)?;
        self.next.fetch_max(past, Ordering::Relaxed);
        Ok(())
    }

    /// The id the next successful allocation will return.
    pub fn peek(&self) -> EntityId {
        EntityId(self.next.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_one() {
        let ids = IdentityAllocator::new();
        assert_eq!(ids.allocate().unwrap(), EntityId::from_raw(1));
        assert_eq!(ids.allocate().unwrap(), EntityId::from_raw(2));
        assert!(!EntityId::from_raw(1).is_none());
        assert!(EntityId::NONE.is_none());
    }

    #[test]
    fn test_zero_start_is_clamped() {
        let ids = IdentityAllocator::starting_at(0);
        assert_eq!(ids.allocate().unwrap().raw(), 1);
    }

    #[test]
    fn test_disable_fails_fast() {
        let ids = IdentityAllocator::new();
        ids.allocate().unwrap();
        ids.disable();
        assert_eq!(ids.allocate(), Err(IdentityError::Disabled));
        assert!(!ids.is_enabled());
    }

    #[test]
    fn test_reserve_skips_remote_ids() {
        let ids = IdentityAllocator::new();
        ids.reserve(EntityId::from_raw(41)).unwrap();
        assert_eq!(ids.allocate().unwrap().raw(), 42);
        // Reserving an older id never moves the counter back.
        ids.reserve(EntityId::from_raw(3)).unwrap();
        assert_eq!(ids.peek().raw(), 43);
    }

    #[test]
    fn test_top_of_id_space_never_wraps() {
        let ids = IdentityAllocator::new();
        assert_eq!(
            ids.reserve(EntityId::from_raw(u64::MAX)),
            Err(IdentityError::Exhausted)
        );
        assert_eq!(ids.allocate().unwrap().raw(), 1);

        ids.reserve(EntityId::from_raw(u64::MAX - 2)).unwrap();
        assert_eq!(ids.allocate().unwrap().raw(), u64::MAX - 1);
        for _ in 0..3 {
            assert_eq!(ids.allocate(), Err(IdentityError::Exhausted));
        }
        assert_eq!(ids.peek().raw(), u64::MAX);
    }

    #[test]
    fn test_concurrent_allocation_is_unique_and_dense() {
        let ids = Arc::new(IdentityAllocator::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || {
                    (0..500)
                        .map(|_| ids.allocate().unwrap().raw())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for t in threads {
            for id in t.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 4000);
        assert!((1..=4000).all(|id| seen.contains(&id)));
    }
}
