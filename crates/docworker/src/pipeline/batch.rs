//! "Last document in the batch" detection and the single notification.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::{DatabaseError, DocumentStore};
use crate::notify::Notifier;

const NOTIFIED_CACHE_CAPACITY: u64 = 10_000;
const NOTIFIED_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// What a completion check ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// The upload was notified earlier.
    AlreadyNotified,
    /// Documents are still QUEUED, or the upload has none.
    Pending,
    /// Another handler holds or completed the claim.
    ClaimLost,
    Sent { recipients: usize },
    /// Sending failed and the claim was released for a later check.
    SendFailed,
}

/// Sends the batch-complete notice at most once per upload.
///
/// The durable claim in the store is what guarantees a single notice across
/// handlers and processes. The in-memory set only saves queries for uploads
/// this process has already seen notified.
pub struct BatchNotifier {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    notified: Cache<Uuid, ()>,
}

impl BatchNotifier {
    pub fn new(store: Arc<dyn DocumentStore>, notifier: Arc<dyn Notifier>) -> Self {
        let notified = Cache::builder()
            .max_capacity(NOTIFIED_CACHE_CAPACITY)
            .time_to_live(NOTIFIED_CACHE_TTL)
            .build();

        Self {
            store,
            notifier,
            notified,
        }
    }

    pub async fn maybe_notify(&self, upload_id: Uuid) -> Result<BatchStatus, DatabaseError> {
        if self.notified.contains_key(&upload_id) {
            return Ok(BatchStatus::AlreadyNotified);
        }

        if !self.store.is_upload_done(upload_id).await? {
            return Ok(BatchStatus::Pending);
        }

        if !self.store.claim_notification(upload_id).await? {
            if self.store.is_notified(upload_id).await? {
                self.notified.insert(upload_id, ());
                return Ok(BatchStatus::AlreadyNotified);
            }
            return Ok(BatchStatus::ClaimLost);
        }

        let recipients = match self.store.list_recipient_emails().await {
            Ok(recipients) => recipients,
            Err(e) => {
                self.release(upload_id).await;
                return Err(e);
            }
        };

        match self.notifier.notify(&recipients, upload_id).await {
            Ok(sent_to) => {
                // The notice is out: never send it again from this process,
                // even if recording it fails.
                self.notified.insert(upload_id, ());
                if let Err(e) = self.store.complete_notification(upload_id, sent_to).await {
                    error!(upload_id = %upload_id, error = %e, "Notification sent but not recorded");
                    return Err(e);
                }
                info!(upload_id = %upload_id, recipients = sent_to, "Batch notification sent");
                Ok(BatchStatus::Sent {
                    recipients: sent_to,
                })
            }
            Err(e) => {
                warn!(upload_id = %upload_id, error = %e, "Could not send batch notification");
                self.release(upload_id).await;
                Ok(BatchStatus::SendFailed)
            }
        }
    }

    async fn release(&self, upload_id: Uuid) {
        if let Err(e) = self.store.release_notification(upload_id).await {
            // The claim lapses once its lease expires.
            warn!(upload_id = %upload_id, error = %e, "Could not release notification claim");
        }
    }
}
