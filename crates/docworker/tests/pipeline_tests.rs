//! Message handling end to end: parse, extract, dedup, persist, notify.

mod common;

use std::time::Duration;

use uuid::Uuid;

use common::{Script, TestHarness};
use docworker::db::{DocumentStatus, DocumentStore};
use docworker::pipeline::HandleOutcome;

const PDF_BYTES: &[u8] = b"%PDF-1.5 resolution";
const DOCX_BYTES: &[u8] = b"PK\x03\x04 circular";

#[tokio::test]
async fn test_valid_job_marks_document_processed() {
    let h = TestHarness::new().await;
    let upload = Uuid::new_v4();
    let doc = h
        .queue(upload, "https://files/a.pdf", Some(Script::content(PDF_BYTES, "Article 1")))
        .await;

    let outcome = h.deliver(doc).await;

    assert_eq!(
        outcome,
        HandleOutcome::Processed {
            document_id: doc,
            upload_id: upload,
            reused: false,
        }
    );
    let stored = h.document(doc).await;
    assert_eq!(stored.status, DocumentStatus::Processed);
    assert_eq!(stored.extracted_text.as_deref(), Some("Article 1"));
    assert_eq!(stored.content_hash.map(|h| h.len()), Some(64));
}

#[tokio::test]
async fn test_redelivery_is_idempotent() {
    let h = TestHarness::new().await;
    let upload = Uuid::new_v4();
    let doc = h
        .queue(upload, "https://files/a.pdf", Some(Script::content(PDF_BYTES, "Article 1")))
        .await;

    h.deliver(doc).await;
    let first = h.document(doc).await;
    h.deliver(doc).await;
    let second = h.document(doc).await;

    assert_eq!(second.status, DocumentStatus::Processed);
    assert_eq!(second.content_hash, first.content_hash);
    assert_eq!(second.extracted_text, first.extracted_text);
    assert_eq!(h.notifier.sent_for(upload), 1);
}

#[tokio::test]
async fn test_identical_bytes_reuse_stored_text() {
    let h = TestHarness::new().await;
    let earlier = h
        .queue(
            Uuid::new_v4(),
            "https://files/original.docx",
            Some(Script::content(DOCX_BYTES, "Original text")),
        )
        .await;
    h.deliver(earlier).await;

    let upload = Uuid::new_v4();
    let copy = h
        .queue(
            upload,
            "https://mirror/copy.docx",
            Some(Script::content(DOCX_BYTES, "Freshly extracted, differently")),
        )
        .await;

    let outcome = h.deliver(copy).await;

    assert_eq!(
        outcome,
        HandleOutcome::Processed {
            document_id: copy,
            upload_id: upload,
            reused: true,
        }
    );
    assert_eq!(outcome.label(), "reused");
    let stored = h.document(copy).await;
    assert_eq!(stored.extracted_text.as_deref(), Some("Original text"));
    assert_eq!(stored.content_hash, h.document(earlier).await.content_hash);
}

#[tokio::test]
async fn test_notification_only_after_last_document() {
    let h = TestHarness::new().await;
    h.add_user("ana@example.com").await;
    let upload = Uuid::new_v4();

    let mut docs = Vec::new();
    for i in 0..3 {
        let url = format!("https://files/{}.pdf", i);
        let text = format!("text {}", i);
        let bytes = format!("bytes {}", i);
        docs.push(
            h.queue(upload, &url, Some(Script::content(bytes.as_bytes(), &text)))
                .await,
        );
    }

    h.deliver(docs[0]).await;
    h.deliver(docs[1]).await;
    assert_eq!(h.notifier.sent_for(upload), 0);

    h.deliver(docs[2]).await;
    assert_eq!(h.notifier.sent_for(upload), 1);

    // Redelivery of any document in a notified batch sends nothing new.
    h.deliver(docs[2]).await;
    h.deliver(docs[0]).await;
    assert_eq!(h.notifier.sent_for(upload), 1);
    assert!(h.store.is_notified(upload).await.unwrap());
}

#[tokio::test]
async fn test_failed_document_still_completes_batch() {
    let h = TestHarness::new().await;
    h.add_user("ana@example.com").await;
    let upload = Uuid::new_v4();
    let ok = h
        .queue(upload, "https://files/ok.pdf", Some(Script::content(PDF_BYTES, "fine")))
        .await;
    let broken = h
        .queue(upload, "https://files/gone.pdf", Some(Script::HttpStatus(404)))
        .await;

    h.deliver(ok).await;
    let outcome = h.deliver(broken).await;

    match outcome {
        HandleOutcome::TerminalError { document_id, message, .. } => {
            assert_eq!(document_id, broken);
            assert!(message.contains("404"), "unexpected message: {}", message);
        }
        other => panic!("Expected TerminalError, got {:?}", other),
    }
    let stored = h.document(broken).await;
    assert_eq!(stored.status, DocumentStatus::Error);
    assert!(stored.error_message.is_some());
    assert_eq!(h.notifier.sent_for(upload), 1);
}

#[tokio::test]
async fn test_poison_message_does_not_block_next() {
    let h = TestHarness::new().await;
    let upload = Uuid::new_v4();
    let doc = h
        .queue(upload, "https://files/a.pdf", Some(Script::content(PDF_BYTES, "ok")))
        .await;

    for poison in [
        &b"{not json"[..],
        &br#"{"DocumentId":"x","UploadId":"y","Url":"z"}"#[..],
        &b""[..],
    ] {
        let outcome = h.pipeline.handle(poison).await;
        assert!(outcome.is_parse_failure(), "got {:?}", outcome);
    }

    assert_eq!(h.extraction.calls(), 0);
    assert!(matches!(
        h.deliver(doc).await,
        HandleOutcome::Processed { .. }
    ));
}

#[tokio::test]
async fn test_body_missing_url_errors_its_document_and_completes_batch() {
    let h = TestHarness::new().await;
    h.add_user("ops@example.com").await;
    let upload = Uuid::new_v4();
    let good = h
        .queue(upload, "https://files/a.pdf", Some(Script::content(PDF_BYTES, "ok")))
        .await;
    let broken = h.queue(upload, "https://files/b.pdf", None).await;

    h.deliver(good).await;
    assert_eq!(h.notifier.sent_for(upload), 0);

    let body = format!(r#"{{"DocumentId":"{}","UploadId":"{}"}}"#, broken, upload);
    let outcome = h.pipeline.handle(body.as_bytes()).await;

    assert!(outcome.is_parse_failure(), "got {:?}", outcome);
    let stored = h.document(broken).await;
    assert_eq!(stored.status, DocumentStatus::Error);
    assert!(stored.error_message.unwrap().contains("Url"));
    assert_eq!(h.notifier.sent_for(upload), 1);
    assert_eq!(h.extraction.calls(), 1);
}

#[tokio::test]
async fn test_failed_notification_is_retried_on_next_check() {
    let h = TestHarness::new().await;
    h.add_user("ana@example.com").await;
    let upload = Uuid::new_v4();
    let doc = h
        .queue(upload, "https://files/a.pdf", Some(Script::content(PDF_BYTES, "ok")))
        .await;

    h.notifier.set_failing(true);
    h.deliver(doc).await;

    assert_eq!(h.notifier.attempts(), 1);
    assert_eq!(h.notifier.sent_for(upload), 0);
    assert!(!h.store.is_notified(upload).await.unwrap());

    h.notifier.set_failing(false);
    h.deliver(doc).await;

    assert_eq!(h.notifier.sent_for(upload), 1);
    assert!(h.store.is_notified(upload).await.unwrap());
}

#[tokio::test]
async fn test_mixed_batch_scenario() {
    let h = TestHarness::new().await;
    h.add_user("ana@example.com").await;
    h.add_user("bo@example.com").await;

    // D0 was processed in an earlier batch.
    let d0 = h
        .queue(
            Uuid::new_v4(),
            "https://files/old/d0.docx",
            Some(Script::content(DOCX_BYTES, "Text of D0")),
        )
        .await;
    h.deliver(d0).await;
    let earlier_notices = h.notifier.sent().len();

    let u1 = Uuid::new_v4();
    let d1 = h
        .queue(u1, "https://files/u1/d1.pdf", Some(Script::content(PDF_BYTES, "Text of D1")))
        .await;
    let d2 = h
        .queue(
            u1,
            "https://files/u1/d2.docx",
            Some(Script::content(DOCX_BYTES, "Re-extracted D2")),
        )
        .await;
    let d3 = h.queue(u1, "https://files/u1/d3.xyz", None).await;

    h.deliver(d1).await;
    h.deliver(d2).await;
    assert_eq!(h.notifier.sent_for(u1), 0);
    h.deliver(d3).await;

    let d1 = h.document(d1).await;
    assert_eq!(d1.status, DocumentStatus::Processed);
    assert_eq!(d1.extracted_text.as_deref(), Some("Text of D1"));

    let d2 = h.document(d2).await;
    assert_eq!(d2.status, DocumentStatus::Processed);
    assert_eq!(d2.extracted_text.as_deref(), Some("Text of D0"));

    let d3 = h.document(d3).await;
    assert_eq!(d3.status, DocumentStatus::Error);
    assert!(d3.error_message.unwrap().contains("Unsupported"));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), earlier_notices + 1);
    let (upload, recipients) = sent.last().unwrap();
    assert_eq!(*upload, u1);
    assert_eq!(recipients, &["ana@example.com", "bo@example.com"]);
}

#[tokio::test]
async fn test_success_after_error_clears_message() {
    let h = TestHarness::new().await;
    let upload = Uuid::new_v4();
    let doc = h
        .queue(upload, "https://files/flaky.pdf", Some(Script::HttpStatus(503)))
        .await;

    h.deliver(doc).await;
    assert_eq!(h.document(doc).await.status, DocumentStatus::Error);

    h.extraction
        .script("https://files/flaky.pdf", Script::content(PDF_BYTES, "recovered"));
    h.deliver(doc).await;

    let stored = h.document(doc).await;
    assert_eq!(stored.status, DocumentStatus::Processed);
    assert!(stored.error_message.is_none());
}

#[tokio::test]
async fn test_failed_redelivery_keeps_processed_text() {
    let h = TestHarness::new().await;
    let upload = Uuid::new_v4();
    let doc = h
        .queue(upload, "https://files/a.pdf", Some(Script::content(PDF_BYTES, "good")))
        .await;
    h.deliver(doc).await;

    // The presigned URL has since expired.
    h.extraction.script("https://files/a.pdf", Script::HttpStatus(403));
    let outcome = h.deliver(doc).await;

    assert!(matches!(outcome, HandleOutcome::TerminalError { .. }));
    let stored = h.document(doc).await;
    assert_eq!(stored.status, DocumentStatus::Processed);
    assert_eq!(stored.extracted_text.as_deref(), Some("good"));
}

#[tokio::test]
async fn test_empty_text_is_terminal_error() {
    let h = TestHarness::new().await;
    let doc = h
        .queue(Uuid::new_v4(), "https://files/scan.pdf", Some(Script::EmptyText))
        .await;

    h.deliver(doc).await;

    let stored = h.document(doc).await;
    assert_eq!(stored.status, DocumentStatus::Error);
    assert_eq!(
        stored.error_message.as_deref(),
        Some("No text could be extracted (scanned PDF?)")
    );
}

#[tokio::test]
async fn test_handler_panic_is_contained() {
    let h = TestHarness::new().await;
    h.add_user("ana@example.com").await;
    let upload = Uuid::new_v4();
    let doc = h
        .queue(upload, "https://files/crash.pdf", Some(Script::Panic))
        .await;

    let outcome = h.deliver(doc).await;

    match outcome {
        HandleOutcome::Unexpected { document_id, error } => {
            assert_eq!(document_id, Some(doc));
            assert!(error.contains("extractor crashed"), "got: {}", error);
        }
        other => panic!("Expected Unexpected, got {:?}", other),
    }
    let stored = h.document(doc).await;
    assert_eq!(stored.status, DocumentStatus::Error);
    assert!(stored.error_message.unwrap().starts_with("Unexpected: "));
    // The failure was terminal for the only document, so the batch is done.
    assert_eq!(h.notifier.sent_for(upload), 1);
}

#[tokio::test]
async fn test_message_deadline_is_terminal() {
    let h = TestHarness::with_message_timeout(Duration::from_millis(100)).await;
    let doc = h
        .queue(Uuid::new_v4(), "https://files/slow.pdf", Some(Script::Hang))
        .await;

    let outcome = h.deliver(doc).await;

    assert!(matches!(outcome, HandleOutcome::TerminalError { .. }));
    let stored = h.document(doc).await;
    assert_eq!(stored.status, DocumentStatus::Error);
    assert!(stored.error_message.unwrap().contains("deadline"));
}

#[tokio::test]
async fn test_unknown_document_sends_nothing() {
    let h = TestHarness::new().await;
    h.add_user("ana@example.com").await;
    h.extraction
        .script("https://files/a.pdf", Script::content(PDF_BYTES, "text"));

    let upload = Uuid::new_v4();
    let body = TestHarness::body(Uuid::new_v4(), upload, "https://files/a.pdf");
    let outcome = h.pipeline.handle(&body).await;

    assert!(matches!(outcome, HandleOutcome::Processed { .. }));
    assert_eq!(h.notifier.sent_for(upload), 0);
}
