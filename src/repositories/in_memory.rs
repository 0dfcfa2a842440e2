use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::allocation::BatchChange;
use crate::entities::product_batch;
use crate::errors::ServiceError;
use crate::repositories::{AllocationStore, GroupRecord};

#[derive(Debug, Default)]
struct State {
    batches: BTreeMap<Uuid, product_batch::Model>,
    groups: Vec<GroupRecord>,
    next_sequence: i64,
    fail_group_commit_at: Option<usize>,
}

/// Allocation store kept entirely in memory.
///
/// Used for dry runs, where nothing may be written back, and for tests. It
/// applies the same conditional batch updates as the database store.
#[derive(Debug, Default)]
pub struct InMemoryAllocationStore {
    state: Mutex<State>,
}

impl InMemoryAllocationStore {
    pub fn new(batches: impl IntoIterator<Item = product_batch::Model>) -> Self {
        Self::with_next_sequence(batches, 1)
    }

    /// Starts group numbering at `next_sequence`.
    pub fn with_next_sequence(
        batches: impl IntoIterator<Item = product_batch::Model>,
        next_sequence: i64,
    ) -> Self {
        let state = State {
            batches: batches.into_iter().map(|b| (b.id, b)).collect(),
            next_sequence,
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Makes the group commit with the given zero-based index fail.
    pub fn fail_group_commit_at(&self, index: usize) {
        self.lock().fail_group_commit_at = Some(index);
    }

    pub fn batches(&self) -> Vec<product_batch::Model> {
        self.lock().batches.values().cloned().collect()
    }

    pub fn batch(&self, id: &Uuid) -> Option<product_batch::Model> {
        self.lock().batches.get(id).cloned()
    }

    pub fn groups(&self) -> Vec<GroupRecord> {
        self.lock().groups.clone()
    }

    /// Changes a batch behind the back of a running allocation.
    pub fn set_remaining(&self, id: &Uuid, remaining: i32) {
        if let Some(batch) = self.lock().batches.get_mut(id) {
            batch.remaining_quantity = remaining;
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // state stays consistent between statements, so a poisoned lock is usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    fn check_changes(&self, changes: &[BatchChange]) -> Result<(), ServiceError> {
        for change in changes {
            match self.batches.get(&change.batch_id) {
                Some(batch) if batch.remaining_quantity == change.previous_remaining => {}
                _ => return Err(ServiceError::ConcurrentModification(change.batch_id)),
            }
        }
        Ok(())
    }

    fn apply_changes(&mut self, changes: &[BatchChange], at: DateTime<Utc>) {
        for change in changes {
            if let Some(batch) = self.batches.get_mut(&change.batch_id) {
                batch.remaining_quantity = change.remaining_quantity;
                batch.status = change.status;
                batch.updated_at = Some(at);
            }
        }
    }
}

#[async_trait]
impl AllocationStore for InMemoryAllocationStore {
    async fn available_batches(&self) -> Result<Vec<product_batch::Model>, ServiceError> {
        let mut batches: Vec<_> = self
            .lock()
            .batches
            .values()
            .filter(|b| b.is_available())
            .cloned()
            .collect();
        batches.sort_by(|a, b| b.unit_price.cmp(&a.unit_price).then(a.id.cmp(&b.id)));
        Ok(batches)
    }

    async fn next_group_sequence(&self) -> Result<i64, ServiceError> {
        let state = self.lock();
        Ok(state
            .groups
            .iter()
            .map(|g| g.group.sequence + 1)
            .max()
            .unwrap_or(state.next_sequence))
    }

    async fn commit_group(
        &self,
        record: &GroupRecord,
        changes: &[BatchChange],
    ) -> Result<(), ServiceError> {
        let mut state = self.lock();
        if state.fail_group_commit_at == Some(state.groups.len()) {
            return Err(ServiceError::InternalError(
                "injected group commit failure".to_string(),
            ));
        }
        state.check_changes(changes)?;
        state.apply_changes(changes, record.group.created_at);
        state.groups.push(record.clone());
        Ok(())
    }

    async fn commit_batch_changes(
        &self,
        changes: &[BatchChange],
        at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let mut state = self.lock();
        state.check_changes(changes)?;
        state.apply_changes(changes, at);
        Ok(())
    }
}
