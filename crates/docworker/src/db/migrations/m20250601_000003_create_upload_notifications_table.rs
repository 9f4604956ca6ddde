//! Creates the `UploadNotifications` table backing the batch notification claim.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UploadNotifications::Table)
                    .if_not_exists()
                    .col(uuid(UploadNotifications::UploadId).primary_key())
                    .col(timestamp_with_time_zone_null(UploadNotifications::ClaimedAt))
                    .col(timestamp_with_time_zone_null(UploadNotifications::NotifiedAt))
                    .col(integer_null(UploadNotifications::RecipientCount))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UploadNotifications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UploadNotifications {
    #[sea_orm(iden = "UploadNotifications")]
    Table,
    #[sea_orm(iden = "UploadId")]
    UploadId,
    #[sea_orm(iden = "ClaimedAt")]
    ClaimedAt,
    #[sea_orm(iden = "NotifiedAt")]
    NotifiedAt,
    #[sea_orm(iden = "RecipientCount")]
    RecipientCount,
}
