use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Session::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Session::Id).text().not_null().primary_key())
                    .col(ColumnDef::new(Session::JoinKey).text().not_null().unique_key())
                    .col(ColumnDef::new(Session::Filters).blob().not_null())
                    .col(ColumnDef::new(Session::Latitude).double().not_null())
                    .col(ColumnDef::new(Session::Longitude).double().not_null())
                    .col(ColumnDef::new(Session::Participants).blob().not_null())
                    .col(ColumnDef::new(Session::Status).text().not_null())
                    .col(
                        ColumnDef::new(Session::Revision)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Session::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Session::ExpiryDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // The retention sweep deletes by expiry date
        manager
            .create_index(
                Index::create()
                    .name("idx_session_expiry_date")
                    .table(Session::Table)
                    .col(Session::ExpiryDate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Session::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Session {
    Table,
    Id,
    JoinKey,
    Filters,
    Latitude,
    Longitude,
    Participants,
    Status,
    Revision,
    CreatedAt,
    ExpiryDate,
}
