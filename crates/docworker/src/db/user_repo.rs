//! Read access to recipient addresses in the `Users` table.

use chrono::Utc;
use sea_orm::{EntityTrait, QueryOrder, QuerySelect, Set};
use uuid::Uuid;

use super::entities::user;
use super::{Database, DatabaseError};

/// Inserts a user. Registration is owned by the upload API; this exists for
/// seeding and tests.
pub async fn insert(db: &Database, email: &str) -> Result<Uuid, DatabaseError> {
    let id = Uuid::new_v4();
    let model = user::ActiveModel {
        id: Set(id),
        email: Set(email.to_string()),
        created_at: Set(Utc::now()),
    };
    user::Entity::insert(model)
        .exec_without_returning(db.conn())
        .await?;
    Ok(id)
}

/// Returns every distinct, non-blank user email, sorted.
pub async fn list_emails(db: &Database) -> Result<Vec<String>, DatabaseError> {
    let emails: Vec<String> = user::Entity::find()
        .select_only()
        .column(user::Column::Email)
        .distinct()
        .order_by_asc(user::Column::Email)
        .into_tuple::<String>()
        .all(db.conn())
        .await?;

    Ok(emails
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect())
}
