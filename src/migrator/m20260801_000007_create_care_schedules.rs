use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CareSchedules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CareSchedules::PetId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CareSchedules::EndDate)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CareSchedules::NextStage).string().not_null())
                    .col(
                        ColumnDef::new(CareSchedules::NextWakeAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CareSchedules::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CareSchedules::UpdatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // The poll loop selects rows with next_wake_at <= now.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_care_schedules_next_wake")
                    .table(CareSchedules::Table)
                    .col(CareSchedules::NextWakeAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CareSchedules::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CareSchedules {
    Table,
    PetId,
    EndDate,
    NextStage,
    NextWakeAt,
    CreatedAt,
    UpdatedAt,
}
