//! Property-based tests for the allocation engine.
//!
//! Random pools are drained completely and the resulting plan is checked
//! against the invariants every run has to keep.

use std::collections::HashMap;

use product_grouping::allocation::{AllocationEngine, BatchPool, PoolBatch, GROUP_CAPACITY};
use product_grouping::entities::BatchStatus;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

// Strategies for generating test data
fn price_strategy() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        // mostly prices that fit, some that never do, the odd free item
        8 => (1i64..=20_000).prop_map(|cents| Decimal::new(cents, 2)),
        1 => (20_001i64..=50_000).prop_map(|cents| Decimal::new(cents, 2)),
        1 => Just(Decimal::ZERO),
    ]
}

fn pool_strategy() -> impl Strategy<Value = Vec<PoolBatch>> {
    prop::collection::vec((price_strategy(), 1i32..=60), 0..25).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (price, quantity))| {
                PoolBatch::new(Uuid::from_u128(i as u128 + 1), price, quantity)
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn groups_never_exceed_capacity(batches in pool_strategy()) {
        let mut pool = BatchPool::new(batches);
        let plan = AllocationEngine::default().allocate_all(&mut pool);

        for outcome in &plan.groups {
            let group = &outcome.group;
            prop_assert!(!group.items.is_empty());
            prop_assert!(group.total_price <= GROUP_CAPACITY, "total {}", group.total_price);
            prop_assert!(group.total_price > Decimal::ZERO);

            let sum: Decimal = group.items.iter().map(|i| i.line_total).sum();
            prop_assert_eq!(sum, group.total_price);
            for item in &group.items {
                prop_assert!(item.quantity > 0);
                prop_assert_eq!(item.line_total, item.unit_price * Decimal::from(item.quantity));
            }
        }
    }

    #[test]
    fn stock_is_conserved(batches in pool_strategy()) {
        let initial: HashMap<Uuid, i32> =
            batches.iter().map(|b| (b.id, b.remaining_quantity)).collect();
        let mut pool = BatchPool::new(batches);
        let plan = AllocationEngine::default().allocate_all(&mut pool);

        let mut placed: HashMap<Uuid, i32> = HashMap::new();
        for outcome in &plan.groups {
            for item in &outcome.group.items {
                *placed.entry(item.batch_id).or_default() += item.quantity;
            }
        }
        let exhausted: HashMap<Uuid, i32> =
            plan.exhausted.iter().map(|c| (c.batch_id, c.taken())).collect();

        for (id, start) in &initial {
            let batch = pool.get(id).expect("batch stays in pool");
            let used = placed.get(id).copied().unwrap_or(0) + exhausted.get(id).copied().unwrap_or(0);
            prop_assert_eq!(used + batch.remaining_quantity, *start);
            prop_assert!(batch.remaining_quantity >= 0);
        }
    }

    #[test]
    fn drained_pool_holds_only_oversized_stock(batches in pool_strategy()) {
        let mut pool = BatchPool::new(batches);
        AllocationEngine::default().allocate_all(&mut pool);

        for batch in pool.iter() {
            if batch.remaining_quantity > 0 {
                prop_assert!(batch.unit_price > GROUP_CAPACITY, "{} left at {}", batch.remaining_quantity, batch.unit_price);
                prop_assert_ne!(batch.status, BatchStatus::Processed);
            } else {
                prop_assert_eq!(batch.status, BatchStatus::Processed);
            }
        }
    }

    #[test]
    fn draining_twice_changes_nothing(batches in pool_strategy()) {
        let engine = AllocationEngine::default();
        let mut pool = BatchPool::new(batches);
        engine.allocate_all(&mut pool);
        let snapshot: Vec<PoolBatch> = pool.iter().cloned().collect();

        let again = engine.allocate_all(&mut pool);
        prop_assert!(again.groups.is_empty());
        prop_assert!(again.exhausted.is_empty());
        prop_assert_eq!(pool.iter().cloned().collect::<Vec<_>>(), snapshot);
    }

    #[test]
    fn changes_mirror_items(batches in pool_strategy()) {
        let mut pool = BatchPool::new(batches);
        let plan = AllocationEngine::default().allocate_all(&mut pool);

        for outcome in &plan.groups {
            prop_assert_eq!(outcome.changes.len(), outcome.group.items.len());
            for (change, item) in outcome.changes.iter().zip(&outcome.group.items) {
                prop_assert_eq!(change.batch_id, item.batch_id);
                prop_assert_eq!(change.taken(), item.quantity);
            }
        }
    }
}
