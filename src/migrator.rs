use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_items_table::Migration),
            Box::new(m20240301_000002_create_requests_table::Migration),
            Box::new(m20240301_000003_create_request_rows_table::Migration),
        ]
    }
}

mod m20240301_000001_create_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Items::ItemId)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Items::ItemName)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Items::ItemGroup).string_len(3).not_null())
                        .col(
                            ColumnDef::new(Items::UnitOfMeasurement)
                                .string_len(3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Items::PriceWithoutVat)
                                .decimal_len(6, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Items::Status).string_len(50).not_null())
                        .col(ColumnDef::new(Items::StorageLocation).string_len(50).null())
                        .col(ColumnDef::new(Items::ContactPerson).text().null())
                        .col(ColumnDef::new(Items::PhotoPath).string().null())
                        .col(
                            ColumnDef::new(Items::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_item_name")
                        .table(Items::Table)
                        .col(Items::ItemName)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Items {
        Table,
        ItemId,
        ItemName,
        ItemGroup,
        UnitOfMeasurement,
        Quantity,
        PriceWithoutVat,
        Status,
        StorageLocation,
        ContactPerson,
        PhotoPath,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_requests_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Requests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Requests::RequestId)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Requests::EmployeeId).big_integer().not_null())
                        .col(ColumnDef::new(Requests::ItemId).big_integer().not_null())
                        .col(
                            ColumnDef::new(Requests::UnitOfMeasurement)
                                .string_len(3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requests::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Requests::PriceWithoutVat)
                                .decimal_len(6, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requests::Comment)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Requests::Status)
                                .string_len(3)
                                .not_null()
                                .default("new"),
                        )
                        .col(
                            ColumnDef::new(Requests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_requests_item_id")
                                .from(Requests::Table, Requests::ItemId)
                                .to(Items::Table, Items::ItemId)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_requests_item_id")
                        .table(Requests::Table)
                        .col(Requests::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_requests_status")
                        .table(Requests::Table)
                        .col(Requests::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Requests::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Requests {
        Table,
        RequestId,
        EmployeeId,
        ItemId,
        UnitOfMeasurement,
        Quantity,
        PriceWithoutVat,
        Comment,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Items {
        Table,
        ItemId,
    }
}

mod m20240301_000003_create_request_rows_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_request_rows_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(RequestRows::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RequestRows::RequestRowId)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(RequestRows::GroupId).integer().not_null())
                        .col(ColumnDef::new(RequestRows::Position).integer().not_null())
                        .col(
                            ColumnDef::new(RequestRows::ItemId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequestRows::UnitOfMeasurement)
                                .string_len(3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequestRows::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(RequestRows::PriceWithoutVat)
                                .decimal_len(6, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequestRows::Comment)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(RequestRows::Status)
                                .string_len(3)
                                .not_null()
                                .default("new"),
                        )
                        .col(
                            ColumnDef::new(RequestRows::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RequestRows::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_request_rows_item_id")
                                .from(RequestRows::Table, RequestRows::ItemId)
                                .to(Items::Table, Items::ItemId)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Positions are dense per group; the pair is the logical identity
            // of a member.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_request_rows_group_position")
                        .table(RequestRows::Table)
                        .col(RequestRows::GroupId)
                        .col(RequestRows::Position)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_request_rows_group_id")
                        .table(RequestRows::Table)
                        .col(RequestRows::GroupId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RequestRows::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum RequestRows {
        Table,
        RequestRowId,
        GroupId,
        Position,
        ItemId,
        UnitOfMeasurement,
        Quantity,
        PriceWithoutVat,
        Comment,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Items {
        Table,
        ItemId,
    }
}
