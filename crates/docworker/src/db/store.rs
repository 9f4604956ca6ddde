//! The `DocumentStore` seam used by the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::{document_repo, notification_repo, user_repo, Database, DatabaseError};

/// Persistence operations the message pipeline depends on.
///
/// Every method is a single, independently committed statement (or, for
/// `claim_notification`, an idempotent insert followed by one conditional
/// update), so handlers may call them concurrently without a surrounding
/// transaction.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Text previously extracted for content with this SHA-256 hex hash.
    async fn find_text_by_hash(&self, hash: &str) -> Result<Option<String>, DatabaseError>;

    /// Marks the document PROCESSED. Returns `false` if the document is unknown.
    async fn mark_processed(
        &self,
        document_id: Uuid,
        content_hash: &str,
        text: &str,
    ) -> Result<bool, DatabaseError>;

    /// Marks the document ERROR. Returns `false` if nothing was updated.
    async fn mark_error(&self, document_id: Uuid, message: &str) -> Result<bool, DatabaseError>;

    /// True iff the upload has documents and none of them is still QUEUED.
    async fn is_upload_done(&self, upload_id: Uuid) -> Result<bool, DatabaseError>;

    async fn list_recipient_emails(&self) -> Result<Vec<String>, DatabaseError>;

    async fn is_notified(&self, upload_id: Uuid) -> Result<bool, DatabaseError>;

    /// Takes the exclusive right to notify for an upload.
    async fn claim_notification(&self, upload_id: Uuid) -> Result<bool, DatabaseError>;

    async fn complete_notification(
        &self,
        upload_id: Uuid,
        recipient_count: usize,
    ) -> Result<(), DatabaseError>;

    async fn release_notification(&self, upload_id: Uuid) -> Result<(), DatabaseError>;
}

/// `DocumentStore` backed by the SeaORM repositories.
#[derive(Clone)]
pub struct SqlDocumentStore {
    db: Database,
    claim_lease: Duration,
}

impl SqlDocumentStore {
    pub fn new(db: Database, claim_lease: Duration) -> Self {
        Self { db, claim_lease }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl DocumentStore for SqlDocumentStore {
    async fn find_text_by_hash(&self, hash: &str) -> Result<Option<String>, DatabaseError> {
        document_repo::find_text_by_hash(&self.db, hash).await
    }

    async fn mark_processed(
        &self,
        document_id: Uuid,
        content_hash: &str,
        text: &str,
    ) -> Result<bool, DatabaseError> {
        document_repo::mark_processed(&self.db, document_id, content_hash, text).await
    }

    async fn mark_error(&self, document_id: Uuid, message: &str) -> Result<bool, DatabaseError> {
        document_repo::mark_error(&self.db, document_id, message).await
    }

    async fn is_upload_done(&self, upload_id: Uuid) -> Result<bool, DatabaseError> {
        document_repo::is_upload_done(&self.db, upload_id).await
    }

    async fn list_recipient_emails(&self) -> Result<Vec<String>, DatabaseError> {
        user_repo::list_emails(&self.db).await
    }

    async fn is_notified(&self, upload_id: Uuid) -> Result<bool, DatabaseError> {
        notification_repo::is_notified(&self.db, upload_id).await
    }

    async fn claim_notification(&self, upload_id: Uuid) -> Result<bool, DatabaseError> {
        notification_repo::try_claim(&self.db, upload_id, self.claim_lease).await
    }

    async fn complete_notification(
        &self,
        upload_id: Uuid,
        recipient_count: usize,
    ) -> Result<(), DatabaseError> {
        notification_repo::complete(&self.db, upload_id, recipient_count).await
    }

    async fn release_notification(&self, upload_id: Uuid) -> Result<(), DatabaseError> {
        notification_repo::release(&self.db, upload_id).await
    }
}
