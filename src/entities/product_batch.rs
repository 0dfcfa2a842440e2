use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A purchased lot of a single product.
///
/// `remaining_quantity` only ever decreases, and only the grouping run
/// touches it after the batch has been imported.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub unit_price: Decimal,
    pub initial_quantity: i32,
    pub remaining_quantity: i32,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_group_item::Entity")]
    GroupItems,
}

impl Related<super::product_group_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the batch can still be offered to a grouping run.
    pub fn is_available(&self) -> bool {
        self.remaining_quantity > 0 && self.status != BatchStatus::Processed
    }
}

/// Batch allocation status
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BatchStatus {
    /// Never touched by a grouping run
    #[sea_orm(string_value = "new")]
    New,
    /// Partially allocated, some quantity remains
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Fully allocated or excluded as unallocatable
    #[sea_orm(string_value = "processed")]
    Processed,
}

impl BatchStatus {
    /// Status a batch takes once `remaining` units are left after an allocation.
    pub fn after_allocation(remaining: i32) -> Self {
        if remaining <= 0 {
            BatchStatus::Processed
        } else {
            BatchStatus::Processing
        }
    }
}
