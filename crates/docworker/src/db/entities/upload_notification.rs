//! Upload notification entity.
//!
//! One row per upload whose completion notice has been claimed or sent.
//! `claimed_at` is a lease held by the handler currently sending; once
//! `notified_at` is set the row never changes again.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "UploadNotifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_name = "UploadId")]
    pub upload_id: Uuid,
    #[sea_orm(column_name = "ClaimedAt")]
    pub claimed_at: Option<DateTimeUtc>,
    #[sea_orm(column_name = "NotifiedAt")]
    pub notified_at: Option<DateTimeUtc>,
    /// Number of recipients the notice went to.
    #[sea_orm(column_name = "RecipientCount")]
    pub recipient_count: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_notified(&self) -> bool {
        self.notified_at.is_some()
    }
}
