use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::allocation::{BatchChange, GroupDraft};
use crate::entities::{product_batch, product_group, product_group_item};
use crate::errors::ServiceError;

pub mod allocation_store;
pub mod in_memory;
pub mod product_batch_repository;
pub mod product_group_repository;

pub use allocation_store::SeaOrmAllocationStore;
pub use in_memory::InMemoryAllocationStore;
pub use product_batch_repository::ProductBatchRepository;
pub use product_group_repository::{GroupDetails, ProductGroupRepository};

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// A group and its items, ready to be written in one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRecord {
    pub group: product_group::Model,
    pub items: Vec<product_group_item::Model>,
}

impl GroupRecord {
    /// Builds the rows for a filled group.
    pub fn from_draft(draft: &GroupDraft, sequence: i64, created_at: DateTime<Utc>) -> Self {
        let group_id = Uuid::new_v4();
        let items = draft
            .items
            .iter()
            .enumerate()
            .map(|(position, item)| product_group_item::Model {
                id: Uuid::new_v4(),
                group_id,
                batch_id: item.batch_id,
                position: position as i32,
                quantity: item.quantity,
                line_total: item.line_total,
            })
            .collect();

        Self {
            group: product_group::Model {
                id: group_id,
                sequence,
                name: product_group::group_name(sequence),
                total_price: draft.total_price,
                created_at,
            },
            items,
        }
    }
}

/// Persistence used by a grouping run.
///
/// `commit_group` must write the group, its items and the batch changes as a
/// single unit: either all of it is visible afterwards or none of it is.
#[async_trait]
pub trait AllocationStore: Send + Sync {
    /// Batches with stock left that are not `Processed`, most expensive first.
    async fn available_batches(&self) -> Result<Vec<product_batch::Model>, ServiceError>;

    /// Sequence number for the next group name.
    async fn next_group_sequence(&self) -> Result<i64, ServiceError>;

    async fn commit_group(
        &self,
        record: &GroupRecord,
        changes: &[BatchChange],
    ) -> Result<(), ServiceError>;

    async fn commit_batch_changes(
        &self,
        changes: &[BatchChange],
        at: DateTime<Utc>,
    ) -> Result<(), ServiceError>;
}
