//! Database error types.

use thiserror::Error;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error reported by SeaORM or the underlying driver.
    #[error("Database error: {0}")]
    Orm(#[from] sea_orm::DbErr),

    /// A migration failed to apply.
    #[error("Migration failed: {reason}")]
    Migration { reason: String },
}
