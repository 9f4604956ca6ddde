//! Database module for persistent storage.
//!
//! Uses SeaORM so the same code runs against the shared Postgres database in
//! production and an in-memory SQLite database in tests. Every repository
//! function issues a single statement and commits on its own.

use std::time::Duration;

use sea_orm::{ConnectOptions, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

pub mod document_repo;
pub mod entities;
pub mod error;
pub mod migrations;
pub mod notification_repo;
pub mod store;
pub mod user_repo;

pub use entities::DocumentStatus;
pub use error::DatabaseError;
pub use store::{DocumentStore, SqlDocumentStore};

use migrations::Migrator;

const MAX_CONNECTIONS: u32 = 10;

/// Cloneable handle around a SeaORM connection pool.
#[derive(Clone)]
pub struct Database {
    conn: DatabaseConnection,
}

impl Database {
    /// Connects to the database at `url` and runs all pending migrations.
    pub async fn connect(url: &str) -> Result<Self, DatabaseError> {
        let mut options = ConnectOptions::new(url.to_string());
        options
            .max_connections(MAX_CONNECTIONS)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = sea_orm::Database::connect(options).await?;
        Self::migrate(&conn).await?;

        log::info!("Database connected and migrated");

        Ok(Self { conn })
    }

    /// Opens an in-memory SQLite database for testing. Runs all migrations.
    ///
    /// The pool is pinned to a single connection because every SQLite
    /// in-memory connection is a separate database.
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(3600))
            .sqlx_logging(false);

        let conn = sea_orm::Database::connect(options).await?;
        Self::migrate(&conn).await?;

        Ok(Self { conn })
    }

    async fn migrate(conn: &DatabaseConnection) -> Result<(), DatabaseError> {
        Migrator::up(conn, None)
            .await
            .map_err(|e| DatabaseError::Migration {
                reason: e.to_string(),
            })
    }

    /// Provides access to the underlying connection pool.
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }
}
