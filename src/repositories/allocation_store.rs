use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::allocation::BatchChange;
use crate::entities::product_batch;
use crate::errors::ServiceError;
use crate::repositories::{
    AllocationStore, GroupRecord, ProductBatchRepository, ProductGroupRepository,
};

/// Database-backed store for grouping runs
#[derive(Debug, Clone)]
pub struct SeaOrmAllocationStore {
    db: Arc<DatabaseConnection>,
    batches: ProductBatchRepository,
    groups: ProductGroupRepository,
}

impl SeaOrmAllocationStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            batches: ProductBatchRepository::new(db.clone()),
            groups: ProductGroupRepository::new(db.clone()),
            db,
        }
    }
}

#[async_trait]
impl AllocationStore for SeaOrmAllocationStore {
    async fn available_batches(&self) -> Result<Vec<product_batch::Model>, ServiceError> {
        self.batches.find_available_for_grouping().await
    }

    async fn next_group_sequence(&self) -> Result<i64, ServiceError> {
        Ok(self.groups.max_sequence().await?.unwrap_or(0) + 1)
    }

    #[instrument(skip_all, fields(group = %record.group.name))]
    async fn commit_group(
        &self,
        record: &GroupRecord,
        changes: &[BatchChange],
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        ProductGroupRepository::insert_with_items(&txn, record).await?;
        if let Err(e) =
            ProductBatchRepository::apply_changes(&txn, changes, record.group.created_at).await
        {
            warn!(error = %e, "Rolling back group commit");
            txn.rollback().await.map_err(ServiceError::db_error)?;
            return Err(e);
        }

        txn.commit().await.map_err(ServiceError::db_error)
    }

    async fn commit_batch_changes(
        &self,
        changes: &[BatchChange],
        at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if changes.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        ProductBatchRepository::apply_changes(&txn, changes, at).await?;
        txn.commit().await.map_err(ServiceError::db_error)
    }
}
