use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::allocation::BatchChange;
use crate::entities::product_batch::{
    ActiveModel as BatchActiveModel, Column, Entity as ProductBatch, Model as BatchModel,
};
use crate::entities::BatchStatus;
use crate::errors::ServiceError;
use crate::repositories::Repository;

use super::BaseRepository;

/// Rows per INSERT statement; keeps SQLite below its bound-parameter limit.
const INSERT_CHUNK_SIZE: usize = 500;

fn to_active_model(model: BatchModel) -> BatchActiveModel {
    BatchActiveModel {
        id: Set(model.id),
        name: Set(model.name),
        unit: Set(model.unit),
        unit_price: Set(model.unit_price),
        initial_quantity: Set(model.initial_quantity),
        remaining_quantity: Set(model.remaining_quantity),
        status: Set(model.status),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
    }
}

/// Repository for product batch operations
#[derive(Debug, Clone)]
pub struct ProductBatchRepository {
    base: BaseRepository,
}

impl ProductBatchRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Inserts all batches of one import in a single transaction
    pub async fn add_batches(&self, batches: Vec<BatchModel>) -> Result<usize, ServiceError> {
        if batches.is_empty() {
            return Ok(0);
        }
        let count = batches.len();

        let txn = self
            .base
            .get_db()
            .begin()
            .await
            .map_err(ServiceError::db_error)?;

        let mut rows = batches.into_iter().map(to_active_model).peekable();
        while rows.peek().is_some() {
            let chunk: Vec<BatchActiveModel> = rows.by_ref().take(INSERT_CHUNK_SIZE).collect();
            ProductBatch::insert_many(chunk)
                .exec_without_returning(&txn)
                .await
                .map_err(ServiceError::db_error)?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;
        debug!(count, "Inserted product batches");
        Ok(count)
    }

    /// Batches that still have stock and are not processed, most expensive first
    pub async fn find_available_for_grouping(&self) -> Result<Vec<BatchModel>, ServiceError> {
        ProductBatch::find()
            .filter(Column::RemainingQuantity.gt(0))
            .filter(Column::Status.ne(BatchStatus::Processed))
            .order_by_desc(Column::UnitPrice)
            .order_by_asc(Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Every batch, newest first
    pub async fn find_all(&self) -> Result<Vec<BatchModel>, ServiceError> {
        ProductBatch::find()
            .order_by_desc(Column::CreatedAt)
            .order_by_asc(Column::Name)
            .all(self.base.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<BatchModel>, ServiceError> {
        ProductBatch::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Writes batch changes on `conn`.
    ///
    /// Each update only applies while the row still holds the quantity the
    /// run read; otherwise another writer got there first and the whole unit
    /// is rejected with `ConcurrentModification`.
    pub async fn apply_changes<C: ConnectionTrait>(
        conn: &C,
        changes: &[BatchChange],
        at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        for change in changes {
            let patch = BatchActiveModel {
                remaining_quantity: Set(change.remaining_quantity),
                status: Set(change.status),
                updated_at: Set(Some(at)),
                ..Default::default()
            };

            let result = ProductBatch::update_many()
                .set(patch)
                .filter(Column::Id.eq(change.batch_id))
                .filter(Column::RemainingQuantity.eq(change.previous_remaining))
                .exec(conn)
                .await
                .map_err(ServiceError::db_error)?;

            if result.rows_affected == 0 {
                return Err(ServiceError::ConcurrentModification(change.batch_id));
            }
        }
        Ok(())
    }
}
