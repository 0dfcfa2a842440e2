//! Greedy allocation of batch quantities into value-capped groups.
//!
//! Everything in this module is synchronous and free of I/O. A run loads the
//! available batches into a [`BatchPool`], asks the [`AllocationEngine`] to fill
//! one group at a time, and persists the returned [`FillOutcome`] before asking
//! for the next one. The pool is scoped to a single run; all cross-run state
//! lives in the persisted batch rows.

mod engine;
mod pool;

pub use engine::{
    AllocationEngine, AllocationPlan, FillOutcome, GroupDraft, GroupItemDraft, CAPACITY_EPSILON,
    GROUP_CAPACITY,
};
pub use pool::{BatchChange, BatchPool, PoolBatch};
