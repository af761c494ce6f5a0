use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per completed data migration (name, version). Rows are
        // inserted once and never updated.
        manager
            .create_table(
                Table::create()
                    .table(SyncStatus::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncStatus::Name).string_len(128).not_null())
                    .col(ColumnDef::new(SyncStatus::Version).integer().not_null())
                    .col(
                        ColumnDef::new(SyncStatus::SyncCompleted)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SyncStatus::CompletedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_sync_status")
                            .col(SyncStatus::Name)
                            .col(SyncStatus::Version),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncStatus::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncStatus {
    Table,
    Name,
    Version,
    SyncCompleted,
    CompletedAt,
}
