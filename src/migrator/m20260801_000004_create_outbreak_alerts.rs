use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OutbreakAlerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OutbreakAlerts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OutbreakAlerts::Disease).string().not_null())
                    .col(ColumnDef::new(OutbreakAlerts::Species).string().not_null())
                    .col(ColumnDef::new(OutbreakAlerts::Regions).json().not_null())
                    .col(
                        ColumnDef::new(OutbreakAlerts::CaseCount)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OutbreakAlerts::AvgConfidence)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OutbreakAlerts::Severity).string().not_null())
                    .col(ColumnDef::new(OutbreakAlerts::Message).text().not_null())
                    .col(
                        ColumnDef::new(OutbreakAlerts::Recommendations)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OutbreakAlerts::DetectionIds)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OutbreakAlerts::IsActive)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OutbreakAlerts::StartedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OutbreakAlerts::EndedAt).date_time())
                    .col(
                        ColumnDef::new(OutbreakAlerts::UpdatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_outbreak_alerts_active")
                    .table(OutbreakAlerts::Table)
                    .col(OutbreakAlerts::Disease)
                    .col(OutbreakAlerts::Species)
                    .col(OutbreakAlerts::IsActive)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OutbreakAlerts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OutbreakAlerts {
    Table,
    Id,
    Disease,
    Species,
    Regions,
    CaseCount,
    AvgConfidence,
    Severity,
    Message,
    Recommendations,
    DetectionIds,
    IsActive,
    StartedAt,
    EndedAt,
    UpdatedAt,
}
