//! Property tests for the qubit allocator.

use std::collections::BTreeSet;

use proptest::prelude::*;
use qsynth_ir::{QubitAllocator, QubitId, QubitState};

#[derive(Debug, Clone)]
enum Op {
    Alloc(u32),
    /// Release the live qubit at this position (modulo the live count).
    Release(usize),
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            (1_u32..=4).prop_map(Op::Alloc),
            (0_usize..64).prop_map(Op::Release),
        ],
        1..=40,
    )
}

// ============================================================================
// Conservation and uniqueness
// ============================================================================

proptest! {
    #[test]
    fn prop_live_count_is_allocations_minus_releases(ops in arb_ops()) {
        let mut alloc = QubitAllocator::new(None);
        let mut live: BTreeSet<QubitId> = BTreeSet::new();
        let mut allocated = 0u32;
        let mut released = 0u32;

        for op in ops {
            match op {
                Op::Alloc(n) => {
                    let ids = alloc.allocate(n).unwrap();
                    for id in ids {
                        // Never hand out an id that is already live.
                        prop_assert!(live.insert(id));
                    }
                    allocated += n;
                }
                Op::Release(pos) => {
                    if live.is_empty() {
                        continue;
                    }
                    let q = *live.iter().nth(pos % live.len()).unwrap();
                    alloc.deallocate(&[q]).unwrap();
                    live.remove(&q);
                    released += 1;
                    prop_assert_eq!(alloc.state(q), QubitState::Reclaimed);
                }
            }
            prop_assert_eq!(alloc.num_allocated(), allocated - released);
            prop_assert_eq!(alloc.live_qubits(), live.iter().copied().collect::<Vec<_>>());
            prop_assert!(alloc.peak() >= alloc.num_allocated());
        }
    }

    #[test]
    fn prop_reuse_is_lowest_index_first(ops in arb_ops(), n in 1_u32..=3) {
        let mut alloc = QubitAllocator::new(None);
        let mut live: BTreeSet<QubitId> = BTreeSet::new();
        for op in ops {
            match op {
                Op::Alloc(k) => live.extend(alloc.allocate(k).unwrap()),
                Op::Release(pos) => {
                    if let Some(&q) = live.iter().nth(pos % live.len().max(1)) {
                        alloc.deallocate(&[q]).unwrap();
                        live.remove(&q);
                    }
                }
            }
        }

        let pool = alloc.pool_size();
        let mut expected: Vec<QubitId> = (0..pool)
            .map(QubitId)
            .filter(|q| !live.contains(q))
            .take(n as usize)
            .collect();
        let mut next = pool;
        while expected.len() < n as usize {
            expected.push(QubitId(next));
            next += 1;
        }
        prop_assert_eq!(alloc.allocate(n).unwrap(), expected);
    }
}
