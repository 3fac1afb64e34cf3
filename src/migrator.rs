use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_branches_table::Migration),
            Box::new(m20250301_000002_create_products_table::Migration),
            Box::new(m20250301_000003_create_product_inventories_table::Migration),
            Box::new(m20250301_000004_create_transfers_table::Migration),
            Box::new(m20250301_000005_create_transfer_lines_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250301_000001_create_branches_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_branches_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Branches::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Branches::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Branches::Code).string().not_null())
                        .col(ColumnDef::new(Branches::Name).string().not_null())
                        .col(ColumnDef::new(Branches::Address).string().null())
                        .col(
                            ColumnDef::new(Branches::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Branches::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Branches::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_branches_code")
                        .table(Branches::Table)
                        .col(Branches::Code)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Branches::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Branches {
        Table,
        Id,
        Code,
        Name,
        Address,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000002_create_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Code).string().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Unit).string().null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_code")
                        .table(Products::Table)
                        .col(Products::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_name")
                        .table(Products::Table)
                        .col(Products::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
        Code,
        Name,
        Unit,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000003_create_product_inventories_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_product_inventories_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductInventories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductInventories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductInventories::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductInventories::BranchId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductInventories::OnHand)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductInventories::Cost)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ProductInventories::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            // One stock row per (product, branch)
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_inventories_product_branch")
                        .table(ProductInventories::Table)
                        .col(ProductInventories::ProductId)
                        .col(ProductInventories::BranchId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_inventories_branch_id")
                        .table(ProductInventories::Table)
                        .col(ProductInventories::BranchId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductInventories::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ProductInventories {
        Table,
        Id,
        ProductId,
        BranchId,
        OnHand,
        Cost,
        UpdatedAt,
    }
}

mod m20250301_000004_create_transfers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_transfers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transfers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Transfers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Transfers::Code).string().not_null())
                        .col(ColumnDef::new(Transfers::FromBranchId).uuid().not_null())
                        .col(ColumnDef::new(Transfers::ToBranchId).uuid().not_null())
                        .col(
                            ColumnDef::new(Transfers::Status)
                                .small_integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Transfers::NoteBySource).string().null())
                        .col(ColumnDef::new(Transfers::NoteByDestination).string().null())
                        .col(ColumnDef::new(Transfers::TransferDate).timestamp().not_null())
                        .col(ColumnDef::new(Transfers::DispatchedAt).timestamp().null())
                        .col(ColumnDef::new(Transfers::ReceivedAt).timestamp().null())
                        .col(ColumnDef::new(Transfers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Transfers::UpdatedAt).timestamp().null())
                        .col(
                            ColumnDef::new(Transfers::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfers_code")
                        .table(Transfers::Table)
                        .col(Transfers::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfers_from_branch_id")
                        .table(Transfers::Table)
                        .col(Transfers::FromBranchId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfers_to_branch_id")
                        .table(Transfers::Table)
                        .col(Transfers::ToBranchId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfers_status")
                        .table(Transfers::Table)
                        .col(Transfers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfers_transfer_date")
                        .table(Transfers::Table)
                        .col(Transfers::TransferDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Transfers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Transfers {
        Table,
        Id,
        Code,
        FromBranchId,
        ToBranchId,
        Status,
        NoteBySource,
        NoteByDestination,
        TransferDate,
        DispatchedAt,
        ReceivedAt,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20250301_000005_create_transfer_lines_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_transfer_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TransferLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferLines::TransferId).uuid().not_null())
                        .col(ColumnDef::new(TransferLines::ProductId).uuid().not_null())
                        .col(ColumnDef::new(TransferLines::ProductCode).string().not_null())
                        .col(ColumnDef::new(TransferLines::ProductName).string().not_null())
                        .col(
                            ColumnDef::new(TransferLines::SendQuantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferLines::ReceivedQuantity)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TransferLines::Price)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(TransferLines::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfer_lines_transfer_id")
                        .table(TransferLines::Table)
                        .col(TransferLines::TransferId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfer_lines_product_id")
                        .table(TransferLines::Table)
                        .col(TransferLines::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferLines::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum TransferLines {
        Table,
        Id,
        TransferId,
        ProductId,
        ProductCode,
        ProductName,
        SendQuantity,
        ReceivedQuantity,
        Price,
        CreatedAt,
    }
}
