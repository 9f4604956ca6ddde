//! Document entity: one row per file in an upload batch.

use sea_orm::entity::prelude::*;

/// Processing state of a document.
///
/// Stored as the upper-case strings written by the upload API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum DocumentStatus {
    #[sea_orm(string_value = "QUEUED")]
    Queued,
    #[sea_orm(string_value = "PROCESSED")]
    Processed,
    #[sea_orm(string_value = "ERROR")]
    Error,
}

/// Document entity model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "Documents")]
pub struct Model {
    /// Identifier assigned by the upload API.
    #[sea_orm(primary_key, auto_increment = false, column_name = "Id")]
    pub id: Uuid,
    /// Batch this document belongs to.
    #[sea_orm(column_name = "UploadId")]
    pub upload_id: Uuid,
    /// Where the source file is downloaded from.
    #[sea_orm(column_name = "UrlDocumento")]
    pub source_url: String,
    #[sea_orm(column_name = "Status")]
    pub status: DocumentStatus,
    /// SHA-256 of the raw downloaded bytes.
    #[sea_orm(column_name = "ContentHash")]
    pub content_hash: Option<String>,
    #[sea_orm(column_name = "ExtractedText", column_type = "Text", nullable)]
    pub extracted_text: Option<String>,
    #[sea_orm(column_name = "ErrorMessage", column_type = "Text", nullable)]
    pub error_message: Option<String>,
    #[sea_orm(column_name = "CreatedAt")]
    pub created_at: DateTimeUtc,
    #[sea_orm(column_name = "UpdatedAt")]
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
