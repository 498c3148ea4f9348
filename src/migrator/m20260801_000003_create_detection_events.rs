use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DetectionEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DetectionEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DetectionEvents::PetId).uuid().not_null())
                    .col(ColumnDef::new(DetectionEvents::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(DetectionEvents::Species).string().not_null())
                    .col(
                        ColumnDef::new(DetectionEvents::Prediction)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DetectionEvents::Confidence)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DetectionEvents::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Clustering scans by (species, prediction) within a recent window.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_detection_events_cluster")
                    .table(DetectionEvents::Table)
                    .col(DetectionEvents::Species)
                    .col(DetectionEvents::Prediction)
                    .col(DetectionEvents::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DetectionEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DetectionEvents {
    Table,
    Id,
    PetId,
    OwnerId,
    Species,
    Prediction,
    Confidence,
    CreatedAt,
}
