use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_product_batches_table::Migration),
            Box::new(m20240301_000002_create_product_groups_table::Migration),
            Box::new(m20240301_000003_create_product_group_items_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_product_batches_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_product_batches_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductBatches::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductBatches::Name)
                                .string_len(300)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductBatches::Unit)
                                .string_len(50)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductBatches::UnitPrice)
                                .decimal_len(18, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductBatches::InitialQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductBatches::RemainingQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductBatches::Status)
                                .string_len(32)
                                .not_null()
                                .default("new"),
                        )
                        .col(
                            ColumnDef::new(ProductBatches::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductBatches::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            // available-for-grouping lookups filter on status and sort by price
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_batches_status")
                        .table(ProductBatches::Table)
                        .col(ProductBatches::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_batches_unit_price")
                        .table(ProductBatches::Table)
                        .col(ProductBatches::UnitPrice)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductBatches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductBatches {
        Table,
        Id,
        Name,
        Unit,
        UnitPrice,
        InitialQuantity,
        RemainingQuantity,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_product_groups_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_product_groups_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductGroups::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductGroups::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductGroups::Sequence)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductGroups::Name)
                                .string_len(200)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductGroups::TotalPrice)
                                .decimal_len(18, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductGroups::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_groups_created_at")
                        .table(ProductGroups::Table)
                        .col(ProductGroups::CreatedAt)
                        .to_owned(),
                )
                .await?;

            // two writers can never both create "Group N"
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("idx_product_groups_sequence")
                        .table(ProductGroups::Table)
                        .col(ProductGroups::Sequence)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductGroups::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductGroups {
        Table,
        Id,
        Sequence,
        Name,
        TotalPrice,
        CreatedAt,
    }
}

mod m20240301_000003_create_product_group_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_product_group_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductGroupItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductGroupItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductGroupItems::GroupId).uuid().not_null())
                        .col(ColumnDef::new(ProductGroupItems::BatchId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductGroupItems::Position)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductGroupItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductGroupItems::LineTotal)
                                .decimal_len(18, 2)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_group_items_group_id")
                                .from(ProductGroupItems::Table, ProductGroupItems::GroupId)
                                .to(ProductGroups::Table, ProductGroups::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_group_items_batch_id")
                                .from(ProductGroupItems::Table, ProductGroupItems::BatchId)
                                .to(ProductBatches::Table, ProductBatches::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_group_items_group_batch")
                        .table(ProductGroupItems::Table)
                        .col(ProductGroupItems::GroupId)
                        .col(ProductGroupItems::BatchId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductGroupItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProductGroupItems {
        Table,
        Id,
        GroupId,
        BatchId,
        Position,
        Quantity,
        LineTotal,
    }

    #[derive(DeriveIden)]
    enum ProductGroups {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum ProductBatches {
        Table,
        Id,
    }
}
