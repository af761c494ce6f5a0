use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::extension::postgres::Type;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Shops::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Shops::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Shops::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Shops::CreatedAt)
                            .date()
                            .not_null()
                            .default(Expr::current_date()),
                    )
                    .col(ColumnDef::new(Shops::InVacations).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shops_created_at")
                    .table(Shops::Table)
                    .col(Shops::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shops_in_vacations")
                    .table(Shops::Table)
                    .col(Shops::InVacations)
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Weekday::Enum)
                    .values(Weekday::ALL)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OpeningHoursShops::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OpeningHoursShops::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OpeningHoursShops::ShopId).big_integer().not_null())
                    .col(
                        ColumnDef::new(OpeningHoursShops::Day)
                            .enumeration(Weekday::Enum, Weekday::ALL)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OpeningHoursShops::OpenAt).time().not_null())
                    .col(ColumnDef::new(OpeningHoursShops::CloseAt).time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_opening_hours_shops_shop")
                            .from(OpeningHoursShops::Table, OpeningHoursShops::ShopId)
                            .to(Shops::Table, Shops::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_opening_hours_shops_shop_id")
                    .table(OpeningHoursShops::Table)
                    .col(OpeningHoursShops::ShopId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OpeningHoursShops::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(Weekday::Enum).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Shops::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Shops {
    Table,
    Id,
    Name,
    CreatedAt,
    InVacations,
}

#[derive(DeriveIden)]
enum OpeningHoursShops {
    Table,
    Id,
    ShopId,
    Day,
    OpenAt,
    CloseAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum Weekday {
    #[sea_orm(iden = "weekday")]
    Enum,
    #[sea_orm(iden = "monday")]
    Monday,
    #[sea_orm(iden = "tuesday")]
    Tuesday,
    #[sea_orm(iden = "wednesday")]
    Wednesday,
    #[sea_orm(iden = "thursday")]
    Thursday,
    #[sea_orm(iden = "friday")]
    Friday,
    #[sea_orm(iden = "saturday")]
    Saturday,
    #[sea_orm(iden = "sunday")]
    Sunday,
}

impl Weekday {
    const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];
}
