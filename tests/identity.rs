use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use sortie::{EntityId, IdentityAllocator, IdentityError};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn concurrent_allocation_is_unique_and_gapless(producers in 1usize..8, per_producer in 1usize..200) {
        let allocator = Arc::new(IdentityAllocator::new());
        let handles: Vec<_> = (0..producers)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                thread::spawn(move || {
                    (0..per_producer)
                        .map(|_| allocator.allocate().unwrap().raw())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                prop_assert!(seen.insert(id), "id {} handed out twice", id);
            }
        }
        let total = (producers * per_producer) as u64;
        let expected: HashSet<u64> = (1..=total).collect();
        prop_assert_eq!(seen, expected);
    }
}

#[test]
fn disabled_allocator_fails_fast() {
    let allocator = IdentityAllocator::new();
    assert_eq!(allocator.allocate(), Ok(EntityId::from_raw(1)));
    allocator.disable();
    assert_eq!(allocator.allocate(), Err(IdentityError::Disabled));
    assert_eq!(allocator.allocate(), Err(IdentityError::Disabled));
}
