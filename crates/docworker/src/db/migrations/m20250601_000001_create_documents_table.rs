//! Creates the `Documents` table when the upload API has not already done so.
//!
//! Column names follow the API's PascalCase schema so the worker can run
//! against the shared database unchanged.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(uuid(Documents::Id).primary_key())
                    .col(uuid(Documents::UploadId))
                    .col(string_len(Documents::UrlDocumento, 1000))
                    .col(string_len(Documents::Status, 20).default("QUEUED"))
                    .col(string_len_null(Documents::ContentHash, 64))
                    .col(text_null(Documents::ExtractedText))
                    .col(text_null(Documents::ErrorMessage))
                    .col(timestamp_with_time_zone(Documents::CreatedAt))
                    .col(timestamp_with_time_zone_null(Documents::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Batch completion counts QUEUED rows per upload
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_documents_upload_status")
                    .table(Documents::Table)
                    .col(Documents::UploadId)
                    .col(Documents::Status)
                    .to_owned(),
            )
            .await?;

        // Dedup lookup by content hash
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_documents_content_hash")
                    .table(Documents::Table)
                    .col(Documents::ContentHash)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Documents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Documents {
    #[sea_orm(iden = "Documents")]
    Table,
    #[sea_orm(iden = "Id")]
    Id,
    #[sea_orm(iden = "UploadId")]
    UploadId,
    #[sea_orm(iden = "UrlDocumento")]
    UrlDocumento,
    #[sea_orm(iden = "Status")]
    Status,
    #[sea_orm(iden = "ContentHash")]
    ContentHash,
    #[sea_orm(iden = "ExtractedText")]
    ExtractedText,
    #[sea_orm(iden = "ErrorMessage")]
    ErrorMessage,
    #[sea_orm(iden = "CreatedAt")]
    CreatedAt,
    #[sea_orm(iden = "UpdatedAt")]
    UpdatedAt,
}
