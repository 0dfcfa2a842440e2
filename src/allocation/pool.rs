use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{product_batch, BatchStatus};

/// In-memory view of one batch for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolBatch {
    pub id: Uuid,
    pub unit_price: Decimal,
    pub initial_quantity: i32,
    pub remaining_quantity: i32,
    pub status: BatchStatus,
}

impl PoolBatch {
    pub fn new(id: Uuid, unit_price: Decimal, quantity: i32) -> Self {
        Self {
            id,
            unit_price,
            initial_quantity: quantity,
            remaining_quantity: quantity,
            status: BatchStatus::New,
        }
    }

    /// A batch the engine may pick from: stock left and a positive price.
    pub fn is_allocatable(&self) -> bool {
        self.remaining_quantity > 0 && self.unit_price > Decimal::ZERO
    }
}

impl From<&product_batch::Model> for PoolBatch {
    fn from(model: &product_batch::Model) -> Self {
        Self {
            id: model.id,
            // some backends hand decimals back through a float
            unit_price: model.unit_price.round_dp(2),
            initial_quantity: model.initial_quantity,
            remaining_quantity: model.remaining_quantity,
            status: model.status,
        }
    }
}

/// New remaining quantity and status of a batch after a mutation.
///
/// `previous_remaining` is the quantity the run observed before the mutation;
/// stores use it to reject the write when the row has moved underneath the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchChange {
    pub batch_id: Uuid,
    pub previous_remaining: i32,
    pub remaining_quantity: i32,
    pub status: BatchStatus,
}

impl BatchChange {
    pub fn taken(&self) -> i32 {
        self.previous_remaining - self.remaining_quantity
    }
}

/// Batches of a single run keyed by id.
///
/// Iteration follows id order, which gives candidate selection a
/// deterministic tie-break: among equal prices the lowest id wins.
#[derive(Debug, Clone, Default)]
pub struct BatchPool {
    batches: BTreeMap<Uuid, PoolBatch>,
}

impl BatchPool {
    /// Builds a pool from loaded batches, dropping anything already exhausted.
    pub fn new(batches: impl IntoIterator<Item = PoolBatch>) -> Self {
        let batches = batches
            .into_iter()
            .filter(|b| b.remaining_quantity > 0 && b.status != BatchStatus::Processed)
            .map(|b| (b.id, b))
            .collect();
        Self { batches }
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&PoolBatch> {
        self.batches.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PoolBatch> {
        self.batches.values()
    }

    /// True while any batch still has stock, regardless of price.
    pub fn has_remaining(&self) -> bool {
        self.batches.values().any(|b| b.remaining_quantity > 0)
    }

    /// Sum of `remaining_quantity * unit_price` over the pool.
    pub fn total_value(&self) -> Decimal {
        self.batches
            .values()
            .map(|b| b.unit_price * Decimal::from(b.remaining_quantity))
            .sum()
    }

    /// Highest priced allocatable batch that still fits into `capacity`.
    pub(crate) fn best_fit(&self, capacity: Decimal) -> Option<&PoolBatch> {
        let mut best: Option<&PoolBatch> = None;
        for batch in self.batches.values() {
            if !batch.is_allocatable() || batch.unit_price > capacity {
                continue;
            }
            match best {
                Some(current) if current.unit_price >= batch.unit_price => {}
                _ => best = Some(batch),
            }
        }
        best
    }

    /// Removes `quantity` units from a batch and reports the resulting change.
    pub(crate) fn take(&mut self, id: &Uuid, quantity: i32) -> Option<BatchChange> {
        let batch = self.batches.get_mut(id)?;
        if quantity <= 0 || quantity > batch.remaining_quantity {
            return None;
        }
        let previous_remaining = batch.remaining_quantity;
        batch.remaining_quantity -= quantity;
        batch.status = BatchStatus::after_allocation(batch.remaining_quantity);
        Some(BatchChange {
            batch_id: batch.id,
            previous_remaining,
            remaining_quantity: batch.remaining_quantity,
            status: batch.status,
        })
    }

    /// Forces every batch with a non-positive price to zero stock and
    /// `Processed`. Such stock can never be placed in a group.
    pub(crate) fn exhaust_unallocatable(&mut self) -> Vec<BatchChange> {
        let mut changes = Vec::new();
        for batch in self.batches.values_mut() {
            if batch.unit_price > Decimal::ZERO {
                continue;
            }
            if batch.remaining_quantity == 0 && batch.status == BatchStatus::Processed {
                continue;
            }
            changes.push(BatchChange {
                batch_id: batch.id,
                previous_remaining: batch.remaining_quantity,
                remaining_quantity: 0,
                status: BatchStatus::Processed,
            });
            batch.remaining_quantity = 0;
            batch.status = BatchStatus::Processed;
        }
        changes
    }
}
