//! Batch-complete notifications.

mod error;
mod smtp;

pub use error::NotifyError;
pub use smtp::SmtpNotifier;

use async_trait::async_trait;
use uuid::Uuid;

/// Sends the "batch complete" notice for an upload.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one notice addressed to every recipient and returns how many
    /// were addressed. Either the whole message is accepted by the transport
    /// or an error is returned. An empty list sends nothing and succeeds.
    async fn notify(&self, recipients: &[String], upload_id: Uuid) -> Result<usize, NotifyError>;
}

/// Plain-text body of the notice.
pub fn notification_body(upload_id: Uuid) -> String {
    format!(
        "Text extraction for upload {} has completed.\nNew documents are available in the system.\n",
        upload_id
    )
}
