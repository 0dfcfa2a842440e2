use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::product_batch::{Entity as ProductBatch, Model as BatchModel};
use crate::entities::product_group::{
    ActiveModel as GroupActiveModel, Column, Entity as ProductGroup, Model as GroupModel,
};
use crate::entities::product_group_item::{
    self, ActiveModel as ItemActiveModel, Entity as ProductGroupItem, Model as ItemModel,
};
use crate::errors::ServiceError;
use crate::repositories::{GroupRecord, Repository};

use super::BaseRepository;

/// A group with its items and the batch behind each item.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDetails {
    pub group: GroupModel,
    pub items: Vec<(ItemModel, BatchModel)>,
}

/// Repository for product group operations
#[derive(Debug, Clone)]
pub struct ProductGroupRepository {
    base: BaseRepository,
}

impl ProductGroupRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// One page of groups, newest first
    pub async fn find_page(&self, skip: u64, take: u64) -> Result<Vec<GroupModel>, ServiceError> {
        ProductGroup::find()
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Sequence)
            .offset(skip)
            .limit(take)
            .all(self.base.get_db())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Group with its items in placement order, or `None` when it does not exist
    pub async fn find_with_items(&self, id: Uuid) -> Result<Option<GroupDetails>, ServiceError> {
        let db = self.base.get_db();
        let Some(group) = ProductGroup::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
        else {
            return Ok(None);
        };

        let rows = ProductGroupItem::find()
            .filter(product_group_item::Column::GroupId.eq(id))
            .order_by_asc(product_group_item::Column::Position)
            .find_also_related(ProductBatch)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let items = rows
            .into_iter()
            .map(|(item, batch)| {
                batch.map(|batch| (item.clone(), batch)).ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "Group item {} references a missing batch",
                        item.id
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(GroupDetails { group, items }))
    }

    /// Highest group sequence handed out so far
    pub async fn max_sequence(&self) -> Result<Option<i64>, ServiceError> {
        let max = ProductGroup::find()
            .select_only()
            .column_as(Column::Sequence.max(), "max_sequence")
            .into_tuple::<Option<i64>>()
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(max.flatten())
    }

    /// Writes a group and its items on `conn`
    pub async fn insert_with_items<C: ConnectionTrait>(
        conn: &C,
        record: &GroupRecord,
    ) -> Result<(), ServiceError> {
        let group = &record.group;
        ProductGroup::insert(GroupActiveModel {
            id: Set(group.id),
            sequence: Set(group.sequence),
            name: Set(group.name.clone()),
            total_price: Set(group.total_price),
            created_at: Set(group.created_at),
        })
        .exec_without_returning(conn)
        .await
        .map_err(ServiceError::db_error)?;

        if record.items.is_empty() {
            return Ok(());
        }

        let items = record.items.iter().map(|item| ItemActiveModel {
            id: Set(item.id),
            group_id: Set(item.group_id),
            batch_id: Set(item.batch_id),
            position: Set(item.position),
            quantity: Set(item.quantity),
            line_total: Set(item.line_total),
        });
        ProductGroupItem::insert_many(items)
            .exec_without_returning(conn)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(())
    }
}
