use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AlertReceipts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AlertReceipts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AlertReceipts::UserId).uuid().not_null())
                    .col(ColumnDef::new(AlertReceipts::AlertKind).string().not_null())
                    .col(ColumnDef::new(AlertReceipts::AlertId).uuid().not_null())
                    .col(ColumnDef::new(AlertReceipts::Read).boolean().not_null())
                    .col(
                        ColumnDef::new(AlertReceipts::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Fan-out dedup checks (user, kind, alert) existence.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_alert_receipts_user_alert")
                    .table(AlertReceipts::Table)
                    .col(AlertReceipts::UserId)
                    .col(AlertReceipts::AlertKind)
                    .col(AlertReceipts::AlertId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AlertReceipts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AlertReceipts {
    Table,
    Id,
    UserId,
    AlertKind,
    AlertId,
    Read,
    CreatedAt,
}
