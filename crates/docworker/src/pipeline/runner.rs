use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::db::DocumentStore;
use crate::extraction::ExtractionService;
use crate::notify::Notifier;
use crate::sanitize::redact_url;

use super::batch::BatchNotifier;
use super::error::PipelineError;
use super::message::{peek_ids, JobMessage};
use super::outcome::HandleOutcome;

/// Handles one job delivery from parse to batch notification.
///
/// [`Pipeline::handle`] never fails and never panics outward: every path ends
/// in a [`HandleOutcome`] and the caller acknowledges the delivery.
pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    extraction: Arc<dyn ExtractionService>,
    batch: BatchNotifier,
    message_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        extraction: Arc<dyn ExtractionService>,
        notifier: Arc<dyn Notifier>,
        message_timeout: Duration,
    ) -> Self {
        let batch = BatchNotifier::new(Arc::clone(&store), notifier);
        Self {
            store,
            extraction,
            batch,
            message_timeout,
        }
    }

    pub async fn handle(&self, body: &[u8]) -> HandleOutcome {
        let detail = match AssertUnwindSafe(self.process(body)).catch_unwind().await {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
        };

        let document_id = peek_ids(body).document_id;
        let fallback = HandleOutcome::Unexpected {
            document_id,
            error: detail.clone(),
        };

        AssertUnwindSafe(self.record_unexpected(body, detail))
            .catch_unwind()
            .await
            .unwrap_or(fallback)
    }

    async fn process(&self, body: &[u8]) -> Result<HandleOutcome, PipelineError> {
        let job = match JobMessage::parse(body) {
            Ok(job) => job,
            Err(e) => {
                warn!(bytes = body.len(), error = %e, "Dropping unparseable message");
                let reason = e.to_string();
                self.record_parse_failure(body, &reason).await;
                return Ok(HandleOutcome::ParseFailure { reason });
            }
        };

        let span = info_span!("handle",
            document_id = %job.document_id,
            upload_id = %job.upload_id,
        );

        self.process_job(job).instrument(span).await
    }

    async fn process_job(&self, job: JobMessage) -> Result<HandleOutcome, PipelineError> {
        info!(url = %redact_url(&job.url), "Processing document");

        // Step 1: download and extract under the message deadline
        let extraction = tokio::time::timeout(
            self.message_timeout,
            self.extraction.extract(&job.url),
        )
        .instrument(info_span!("extract"))
        .await;

        let extracted = match extraction {
            Ok(Ok(extracted)) => extracted,
            Ok(Err(e)) => {
                warn!(kind = e.kind(), error = %e, "Extraction failed");
                return self.fail(&job, e.to_string()).await;
            }
            Err(_) => {
                let message = format!(
                    "Processing exceeded the {}s deadline",
                    self.message_timeout.as_secs()
                );
                warn!("{}", message);
                return self.fail(&job, message).await;
            }
        };

        // Step 2: reuse text of byte-identical content
        let (text, reused) = {
            let existing = self
                .store
                .find_text_by_hash(&extracted.content_hash)
                .instrument(info_span!("dedup"))
                .await?;
            match existing {
                Some(text) => (text, true),
                None => (extracted.text, false),
            }
        };

        // Step 3: persist
        let updated = self
            .store
            .mark_processed(job.document_id, &extracted.content_hash, &text)
            .instrument(info_span!("persist"))
            .await?;
        if updated {
            info!(chars = text.chars().count(), reused, "Document processed");
        } else {
            warn!("Document is unknown to the store, nothing updated");
        }

        // Step 4: batch completion
        self.check_batch(job.upload_id).await;

        Ok(HandleOutcome::Processed {
            document_id: job.document_id,
            upload_id: job.upload_id,
            reused,
        })
    }

    /// Records a terminal extraction failure, then runs the completion check.
    async fn fail(&self, job: &JobMessage, message: String) -> Result<HandleOutcome, PipelineError> {
        let updated = self
            .store
            .mark_error(job.document_id, &message)
            .instrument(info_span!("persist"))
            .await?;
        if !updated {
            debug!("Error not recorded: document is unknown or already processed");
        }

        self.check_batch(job.upload_id).await;

        Ok(HandleOutcome::TerminalError {
            document_id: job.document_id,
            upload_id: job.upload_id,
            message,
        })
    }

    /// Marks the document named by a malformed body as ERROR so it cannot
    /// hold its batch open.
    async fn record_parse_failure(&self, body: &[u8], reason: &str) {
        let ids = peek_ids(body);
        let Some(document_id) = ids.document_id else {
            return;
        };

        let result = self
            .store
            .mark_error(document_id, reason)
            .instrument(info_span!("persist", document_id = %document_id))
            .await;
        if let Err(e) = result {
            warn!(document_id = %document_id, error = %e, "Could not record parse failure");
            return;
        }

        if let Some(upload_id) = ids.upload_id {
            self.check_batch(upload_id).await;
        }
    }

    async fn check_batch(&self, upload_id: Uuid) {
        let result = self
            .batch
            .maybe_notify(upload_id)
            .instrument(info_span!("batch_check"))
            .await;

        match result {
            Ok(status) => debug!(?status, "Batch check finished"),
            Err(e) => warn!(error = %e, "Batch completion check failed"),
        }
    }

    async fn record_unexpected(&self, body: &[u8], detail: String) -> HandleOutcome {
        let ids = peek_ids(body);
        error!(
            document_id = ?ids.document_id,
            error = %detail,
            "Unexpected failure while handling message"
        );

        if let Some(document_id) = ids.document_id {
            let message = format!("Unexpected: {}", detail);
            match self.store.mark_error(document_id, &message).await {
                Ok(_) => {
                    if let Some(upload_id) = ids.upload_id {
                        self.check_batch(upload_id).await;
                    }
                }
                Err(e) => {
                    warn!(document_id = %document_id, error = %e, "Could not record unexpected failure")
                }
            }
        }

        HandleOutcome::Unexpected {
            document_id: ids.document_id,
            error: detail,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
