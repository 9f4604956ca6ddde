//! State transitions for the `Documents` table.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use uuid::Uuid;

use super::entities::document::{self, DocumentStatus};
use super::{Database, DatabaseError};

/// Maximum number of characters kept from an error message.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 1000;

/// Truncates `message` to at most `max_chars` characters on a char boundary.
pub fn truncate_message(message: &str, max_chars: usize) -> &str {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => &message[..idx],
        None => message,
    }
}

/// Inserts a new QUEUED document. The upload API normally does this; the
/// worker uses it for seeding and tests.
pub async fn insert_queued(
    db: &Database,
    id: Uuid,
    upload_id: Uuid,
    source_url: &str,
) -> Result<(), DatabaseError> {
    let model = document::ActiveModel {
        id: Set(id),
        upload_id: Set(upload_id),
        source_url: Set(source_url.to_string()),
        status: Set(DocumentStatus::Queued),
        content_hash: Set(None),
        extracted_text: Set(None),
        error_message: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    };
    document::Entity::insert(model)
        .exec_without_returning(db.conn())
        .await?;
    Ok(())
}

/// Finds a document by its ID.
pub async fn find_by_id(db: &Database, id: Uuid) -> Result<Option<document::Model>, DatabaseError> {
    Ok(document::Entity::find_by_id(id).one(db.conn()).await?)
}

/// Returns the stored text of any document with the given content hash.
///
/// The lookup spans all uploads: identical bytes reuse text extracted for an
/// earlier batch.
pub async fn find_text_by_hash(db: &Database, hash: &str) -> Result<Option<String>, DatabaseError> {
    let text = document::Entity::find()
        .select_only()
        .column(document::Column::ExtractedText)
        .filter(document::Column::ContentHash.eq(hash))
        .filter(document::Column::ExtractedText.is_not_null())
        .order_by_asc(document::Column::CreatedAt)
        .into_tuple::<String>()
        .one(db.conn())
        .await?;
    Ok(text)
}

/// Moves a document to PROCESSED with its hash and text, clearing any error.
///
/// Returns `false` when no document with `id` exists.
pub async fn mark_processed(
    db: &Database,
    id: Uuid,
    content_hash: &str,
    text: &str,
) -> Result<bool, DatabaseError> {
    let result = document::Entity::update_many()
        .col_expr(
            document::Column::Status,
            Expr::value(DocumentStatus::Processed.to_value()),
        )
        .col_expr(document::Column::ContentHash, Expr::value(content_hash))
        .col_expr(document::Column::ExtractedText, Expr::value(text))
        .col_expr(
            document::Column::ErrorMessage,
            Expr::value(Option::<String>::None),
        )
        .col_expr(document::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(document::Column::Id.eq(id))
        .exec(db.conn())
        .await?;
    Ok(result.rows_affected > 0)
}

/// Moves a document to ERROR with a truncated message.
///
/// A document that is already PROCESSED keeps its text: a failed redelivery
/// (e.g. the source URL has since expired) must not discard a good result.
/// Returns `false` when nothing was updated.
pub async fn mark_error(db: &Database, id: Uuid, message: &str) -> Result<bool, DatabaseError> {
    let message = truncate_message(message, MAX_ERROR_MESSAGE_CHARS);
    let result = document::Entity::update_many()
        .col_expr(
            document::Column::Status,
            Expr::value(DocumentStatus::Error.to_value()),
        )
        .col_expr(document::Column::ErrorMessage, Expr::value(message))
        .col_expr(document::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(document::Column::Id.eq(id))
        .filter(document::Column::Status.ne(DocumentStatus::Processed.to_value()))
        .exec(db.conn())
        .await?;
    Ok(result.rows_affected > 0)
}

/// Counts the documents of an upload that are still QUEUED.
pub async fn count_queued(db: &Database, upload_id: Uuid) -> Result<u64, DatabaseError> {
    Ok(document::Entity::find()
        .filter(document::Column::UploadId.eq(upload_id))
        .filter(document::Column::Status.eq(DocumentStatus::Queued.to_value()))
        .count(db.conn())
        .await?)
}

/// True iff the upload has documents and none of them remains QUEUED.
///
/// An upload with no documents is never done, so a job naming an unknown
/// upload cannot trigger a notification.
pub async fn is_upload_done(db: &Database, upload_id: Uuid) -> Result<bool, DatabaseError> {
    let any_document = document::Entity::find()
        .select_only()
        .column(document::Column::Id)
        .filter(document::Column::UploadId.eq(upload_id))
        .into_tuple::<Uuid>()
        .one(db.conn())
        .await?;

    Ok(any_document.is_some() && count_queued(db, upload_id).await? == 0)
}
