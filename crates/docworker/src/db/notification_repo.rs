//! The durable "notify once" claim on `UploadNotifications`.
//!
//! A handler that finds a batch complete calls [`try_claim`]. The claim is a
//! single conditional UPDATE, so of any number of handlers (in this process
//! or another) racing on the same upload, at most one sees `true`. The
//! winner either [`complete`]s the claim after sending, or [`release`]s it
//! when sending failed so the next completion check can try again. A claim
//! whose holder crashed expires after the lease.

use std::time::Duration;

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::entities::upload_notification;
use super::{Database, DatabaseError};

/// Finds the notification row for an upload.
pub async fn find(
    db: &Database,
    upload_id: Uuid,
) -> Result<Option<upload_notification::Model>, DatabaseError> {
    Ok(upload_notification::Entity::find_by_id(upload_id)
        .one(db.conn())
        .await?)
}

/// True once a notification for the upload has been sent.
pub async fn is_notified(db: &Database, upload_id: Uuid) -> Result<bool, DatabaseError> {
    Ok(find(db, upload_id)
        .await?
        .map(|row| row.is_notified())
        .unwrap_or(false))
}

/// Attempts to take the right to send the upload's notification.
pub async fn try_claim(
    db: &Database,
    upload_id: Uuid,
    lease: Duration,
) -> Result<bool, DatabaseError> {
    let row = upload_notification::ActiveModel {
        upload_id: Set(upload_id),
        claimed_at: Set(None),
        notified_at: Set(None),
        recipient_count: Set(None),
    };
    upload_notification::Entity::insert(row)
        .on_conflict(
            OnConflict::column(upload_notification::Column::UploadId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db.conn())
        .await?;

    let now = Utc::now();
    let lease = chrono::Duration::from_std(lease).unwrap_or(chrono::Duration::zero());
    let stale_before = now - lease;

    let result = upload_notification::Entity::update_many()
        .col_expr(upload_notification::Column::ClaimedAt, Expr::value(now))
        .filter(upload_notification::Column::UploadId.eq(upload_id))
        .filter(upload_notification::Column::NotifiedAt.is_null())
        .filter(
            Condition::any()
                .add(upload_notification::Column::ClaimedAt.is_null())
                .add(upload_notification::Column::ClaimedAt.lt(stale_before)),
        )
        .exec(db.conn())
        .await?;

    Ok(result.rows_affected == 1)
}

/// Records that the notification was sent. Terminal for the row.
pub async fn complete(
    db: &Database,
    upload_id: Uuid,
    recipient_count: usize,
) -> Result<(), DatabaseError> {
    let count = i32::try_from(recipient_count).unwrap_or(i32::MAX);
    upload_notification::Entity::update_many()
        .col_expr(upload_notification::Column::NotifiedAt, Expr::value(Utc::now()))
        .col_expr(upload_notification::Column::RecipientCount, Expr::value(count))
        .filter(upload_notification::Column::UploadId.eq(upload_id))
        .exec(db.conn())
        .await?;
    Ok(())
}

/// Gives the claim back after a failed send.
pub async fn release(db: &Database, upload_id: Uuid) -> Result<(), DatabaseError> {
    upload_notification::Entity::update_many()
        .col_expr(
            upload_notification::Column::ClaimedAt,
            Expr::value(Option::<chrono::DateTime<Utc>>::None),
        )
        .filter(upload_notification::Column::UploadId.eq(upload_id))
        .filter(upload_notification::Column::NotifiedAt.is_null())
        .exec(db.conn())
        .await?;
    Ok(())
}
