use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{product_batch, product_group, BatchStatus};
use crate::errors::ServiceError;
use crate::repositories::{GroupDetails, ProductBatchRepository, ProductGroupRepository};

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 200;

/// Clamps a requested page size into `1..=MAX_PAGE_SIZE`.
pub fn clamp_take(take: Option<u64>) -> u64 {
    take.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GroupSummary {
    pub id: Uuid,
    #[schema(example = "Group 1")]
    pub name: String,
    #[schema(value_type = String, example = "200.00")]
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<product_group::Model> for GroupSummary {
    fn from(model: product_group::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            total_price: model.total_price,
            created_at: model.created_at,
        }
    }
}

/// One line of a group: how many units of which batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GroupItemView {
    pub batch_id: Uuid,
    pub name: String,
    pub unit: String,
    #[schema(value_type = String, example = "10.00")]
    pub unit_price: Decimal,
    pub quantity: i32,
    #[schema(value_type = String, example = "50.00")]
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchView {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    #[schema(value_type = String, example = "10.00")]
    pub unit_price: Decimal,
    pub initial_quantity: i32,
    pub remaining_quantity: i32,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<product_batch::Model> for BatchView {
    fn from(model: product_batch::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            unit: model.unit,
            unit_price: model.unit_price,
            initial_quantity: model.initial_quantity,
            remaining_quantity: model.remaining_quantity,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn item_views(details: GroupDetails) -> Vec<GroupItemView> {
    details
        .items
        .into_iter()
        .map(|(item, batch)| GroupItemView {
            batch_id: batch.id,
            name: batch.name,
            unit: batch.unit,
            unit_price: batch.unit_price,
            quantity: item.quantity,
            line_total: item.line_total,
        })
        .collect()
}

/// Read side for groups and batches.
#[derive(Debug, Clone)]
pub struct GroupQueryService {
    groups: ProductGroupRepository,
    batches: ProductBatchRepository,
}

impl GroupQueryService {
    pub fn new(groups: ProductGroupRepository, batches: ProductBatchRepository) -> Self {
        Self { groups, batches }
    }

    #[instrument(skip(self))]
    pub async fn list_groups(
        &self,
        skip: Option<u64>,
        take: Option<u64>,
    ) -> Result<Vec<GroupSummary>, ServiceError> {
        let groups = self
            .groups
            .find_page(skip.unwrap_or(0), clamp_take(take))
            .await?;
        Ok(groups.into_iter().map(GroupSummary::from).collect())
    }

    /// Items of one group in placement order.
    #[instrument(skip(self))]
    pub async fn group_items(&self, id: Uuid) -> Result<Vec<GroupItemView>, ServiceError> {
        let details = self
            .groups
            .find_with_items(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Group {} not found", id)))?;
        Ok(item_views(details))
    }

    #[instrument(skip(self))]
    pub async fn list_batches(&self) -> Result<Vec<BatchView>, ServiceError> {
        let batches = self.batches.find_all().await?;
        Ok(batches.into_iter().map(BatchView::from).collect())
    }
}
