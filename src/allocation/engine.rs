use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use uuid::Uuid;

use super::pool::{BatchChange, BatchPool};

/// Maximum total value of a single group.
pub const GROUP_CAPACITY: Decimal = dec!(200);

/// Capacity left below this is treated as zero. It is smaller than the
/// smallest currency increment, so it can never admit an extra unit.
pub const CAPACITY_EPSILON: Decimal = dec!(0.0001);

/// One batch slice placed into a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupItemDraft {
    pub batch_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// A group filled by one pass of the engine, not yet persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupDraft {
    pub items: Vec<GroupItemDraft>,
    pub total_price: Decimal,
}

impl GroupDraft {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Result of one filling pass: the group and the batch mutations behind it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillOutcome {
    pub group: GroupDraft,
    pub changes: Vec<BatchChange>,
}

/// Every group a pool produces when drained in one go.
#[derive(Debug, Clone, Default)]
pub struct AllocationPlan {
    pub groups: Vec<FillOutcome>,
    /// Batches forced to `Processed` because their price is not positive.
    pub exhausted: Vec<BatchChange>,
}

/// Greedy "largest that still fits" packer.
///
/// Each pass repeatedly takes the most expensive batch whose unit price fits
/// the capacity left in the group, and as many whole units of it as fit. This
/// does not search for the best combination; quantities being divisible keeps
/// the result close to the ceiling in practice.
#[derive(Debug, Clone, Copy)]
pub struct AllocationEngine {
    capacity: Decimal,
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::with_capacity(GROUP_CAPACITY)
    }
}

impl AllocationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: Decimal) -> Self {
        Self { capacity }
    }

    /// Fills one group from the pool.
    ///
    /// An empty group means nothing left in the pool can be placed.
    pub fn fill_group(&self, pool: &mut BatchPool) -> FillOutcome {
        let mut remaining_capacity = self.capacity;
        let mut outcome = FillOutcome::default();

        while remaining_capacity > CAPACITY_EPSILON {
            let Some(candidate) = pool.best_fit(remaining_capacity) else {
                break;
            };
            let batch_id = candidate.id;
            let unit_price = candidate.unit_price;
            let available = candidate.remaining_quantity;

            let fits = (remaining_capacity / unit_price)
                .floor()
                .to_i64()
                .unwrap_or(i64::MAX);
            let quantity = fits.min(i64::from(available));
            if quantity <= 0 {
                break;
            }
            // bounded by `available`
            let quantity = quantity as i32;

            let Some(change) = pool.take(&batch_id, quantity) else {
                break;
            };
            let line_total = (unit_price * Decimal::from(quantity)).round_dp(2);

            outcome.group.total_price += line_total;
            remaining_capacity -= line_total;
            outcome.group.items.push(GroupItemDraft {
                batch_id,
                quantity,
                unit_price,
                line_total,
            });
            outcome.changes.push(change);
        }

        outcome
    }

    /// Zeroes out stock that can never be placed (non-positive prices).
    pub fn exhaust_unallocatable(&self, pool: &mut BatchPool) -> Vec<BatchChange> {
        pool.exhaust_unallocatable()
    }

    /// Drains the pool without persisting anything in between.
    pub fn allocate_all(&self, pool: &mut BatchPool) -> AllocationPlan {
        let mut plan = AllocationPlan::default();
        while pool.has_remaining() {
            let outcome = self.fill_group(pool);
            if outcome.group.is_empty() {
                plan.exhausted = self.exhaust_unallocatable(pool);
                break;
            }
            plan.groups.push(outcome);
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::PoolBatch;
    use crate::entities::BatchStatus;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn sample_pool() -> BatchPool {
        BatchPool::new(vec![
            PoolBatch::new(id(1), dec!(150), 1),
            PoolBatch::new(id(2), dec!(60), 2),
            PoolBatch::new(id(3), dec!(10), 100),
        ])
    }

    fn quantities(outcome: &FillOutcome) -> Vec<(Uuid, i32)> {
        outcome
            .group
            .items
            .iter()
            .map(|item| (item.batch_id, item.quantity))
            .collect()
    }

    #[test]
    fn first_group_takes_expensive_batch_then_fills_with_cheap_one() {
        let engine = AllocationEngine::new();
        let mut pool = sample_pool();

        let first = engine.fill_group(&mut pool);
        assert_eq!(quantities(&first), vec![(id(1), 1), (id(3), 5)]);
        assert_eq!(first.group.total_price, dec!(200));

        let second = engine.fill_group(&mut pool);
        assert_eq!(quantities(&second), vec![(id(2), 2), (id(3), 8)]);
        assert_eq!(second.group.total_price, dec!(200));

        assert_eq!(pool.get(&id(1)).unwrap().remaining_quantity, 0);
        assert_eq!(pool.get(&id(2)).unwrap().remaining_quantity, 0);
        assert_eq!(pool.get(&id(3)).unwrap().remaining_quantity, 87);
        assert_eq!(pool.get(&id(3)).unwrap().status, BatchStatus::Processing);
    }

    #[test]
    fn drains_sample_pool_into_seven_groups() {
        let engine = AllocationEngine::new();
        let mut pool = sample_pool();

        let plan = engine.allocate_all(&mut pool);
        let totals: Vec<Decimal> = plan.groups.iter().map(|g| g.group.total_price).collect();
        assert_eq!(
            totals,
            vec![
                dec!(200),
                dec!(200),
                dec!(200),
                dec!(200),
                dec!(200),
                dec!(200),
                dec!(70)
            ]
        );
        assert!(plan.exhausted.is_empty());
        assert!(!pool.has_remaining());
        assert!(pool.iter().all(|b| b.status == BatchStatus::Processed));
    }

    #[test]
    fn free_batch_yields_no_group_and_is_exhausted() {
        let engine = AllocationEngine::new();
        let mut pool = BatchPool::new(vec![PoolBatch::new(id(1), dec!(0), 10)]);

        let plan = engine.allocate_all(&mut pool);
        assert!(plan.groups.is_empty());
        assert_eq!(plan.exhausted.len(), 1);
        assert_eq!(plan.exhausted[0].previous_remaining, 10);
        let batch = pool.get(&id(1)).unwrap();
        assert_eq!(batch.remaining_quantity, 0);
        assert_eq!(batch.status, BatchStatus::Processed);
    }

    #[test]
    fn batch_above_capacity_is_left_untouched() {
        let engine = AllocationEngine::new();
        let mut pool = BatchPool::new(vec![
            PoolBatch::new(id(1), dec!(250), 3),
            PoolBatch::new(id(2), dec!(0), 1),
        ]);

        let plan = engine.allocate_all(&mut pool);
        assert!(plan.groups.is_empty());
        assert_eq!(plan.exhausted.len(), 1);
        assert_eq!(plan.exhausted[0].batch_id, id(2));
        let expensive = pool.get(&id(1)).unwrap();
        assert_eq!(expensive.remaining_quantity, 3);
        assert_eq!(expensive.status, BatchStatus::New);
    }

    #[test]
    fn exact_fit_fills_capacity() {
        let engine = AllocationEngine::new();
        let mut pool = BatchPool::new(vec![PoolBatch::new(id(1), dec!(200), 2)]);

        let outcome = engine.fill_group(&mut pool);
        assert_eq!(quantities(&outcome), vec![(id(1), 1)]);
        assert_eq!(outcome.group.total_price, dec!(200));
        assert_eq!(pool.get(&id(1)).unwrap().remaining_quantity, 1);
    }

    #[test]
    fn fractional_prices_never_overshoot() {
        let engine = AllocationEngine::new();
        let mut pool = BatchPool::new(vec![
            PoolBatch::new(id(1), dec!(33.33), 10),
            PoolBatch::new(id(2), dec!(0.07), 1000),
        ]);

        let outcome = engine.fill_group(&mut pool);
        // 6 * 33.33 = 199.98, then nothing at 0.07 fits the last 0.02
        assert_eq!(quantities(&outcome), vec![(id(1), 6)]);
        assert_eq!(outcome.group.total_price, dec!(199.98));
        assert!(outcome.group.total_price <= GROUP_CAPACITY + CAPACITY_EPSILON);
    }

    #[test]
    fn a_batch_appears_once_per_group() {
        let engine = AllocationEngine::new();
        let mut pool = BatchPool::new(vec![
            PoolBatch::new(id(1), dec!(45), 10),
            PoolBatch::new(id(2), dec!(3), 10),
        ]);

        let outcome = engine.fill_group(&mut pool);
        assert_eq!(quantities(&outcome), vec![(id(1), 4), (id(2), 6)]);
        assert_eq!(outcome.group.total_price, dec!(198));
    }

    #[test]
    fn changes_match_items() {
        let engine = AllocationEngine::new();
        let mut pool = sample_pool();

        let outcome = engine.fill_group(&mut pool);
        assert_eq!(outcome.changes.len(), outcome.group.items.len());
        for (change, item) in outcome.changes.iter().zip(&outcome.group.items) {
            assert_eq!(change.batch_id, item.batch_id);
            assert_eq!(change.taken(), item.quantity);
        }
    }

    #[test]
    fn custom_capacity_is_respected() {
        let engine = AllocationEngine::with_capacity(dec!(50));
        let mut pool = BatchPool::new(vec![PoolBatch::new(id(1), dec!(20), 10)]);

        let outcome = engine.fill_group(&mut pool);
        assert_eq!(quantities(&outcome), vec![(id(1), 2)]);
        assert_eq!(outcome.group.total_price, dec!(40));
    }

    #[test]
    fn empty_pool_produces_empty_plan() {
        let engine = AllocationEngine::new();
        let mut pool = BatchPool::default();

        let plan = engine.allocate_all(&mut pool);
        assert!(plan.groups.is_empty());
        assert!(plan.exhausted.is_empty());
        assert!(engine.fill_group(&mut pool).group.is_empty());
    }
}
