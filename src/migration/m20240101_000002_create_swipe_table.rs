use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Swipe::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Swipe::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Swipe::SessionId).text().not_null())
                    .col(ColumnDef::new(Swipe::ParticipantHandle).text().not_null())
                    .col(ColumnDef::new(Swipe::CandidateId).text().not_null())
                    .col(ColumnDef::new(Swipe::Direction).text().not_null())
                    .col(ColumnDef::new(Swipe::CandidateSnapshot).blob().not_null())
                    .col(
                        ColumnDef::new(Swipe::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // First decision wins: one row per participant and candidate in a session
        manager
            .create_index(
                Index::create()
                    .name("uq_swipe_session_participant_candidate")
                    .table(Swipe::Table)
                    .col(Swipe::SessionId)
                    .col(Swipe::ParticipantHandle)
                    .col(Swipe::CandidateId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_swipe_session_direction")
                    .table(Swipe::Table)
                    .col(Swipe::SessionId)
                    .col(Swipe::Direction)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Swipe::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Swipe {
    Table,
    Id,
    SessionId,
    ParticipantHandle,
    CandidateId,
    Direction,
    CandidateSnapshot,
    CreatedAt,
}
