//! Test doubles for the pipeline's outbound seams.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use docworker::error::{DownloadError, ProcessError};
use docworker::extraction::{sha256_hex, Extracted, ExtractionError, ExtractionService};
use docworker::notify::{Notifier, NotifyError};
use docworker::processor::DocumentFormat;

/// What the fake extraction service does for one URL.
#[derive(Debug, Clone)]
pub enum Script {
    /// Succeeds; the hash is computed from `bytes`.
    Content { bytes: Vec<u8>, text: String },
    /// Fails like an HTTP error response.
    HttpStatus(u16),
    /// Fails like a file without text.
    EmptyText,
    Panic,
    /// Never finishes.
    Hang,
}

impl Script {
    pub fn content(bytes: &[u8], text: &str) -> Self {
        Self::Content {
            bytes: bytes.to_vec(),
            text: text.to_string(),
        }
    }
}

/// Extraction service driven by a URL → [`Script`] table.
///
/// URLs with no script behave like the real service does for them: an
/// unsupported extension is an extraction error, anything else a 404.
#[derive(Default)]
pub struct ScriptedExtraction {
    scripts: Mutex<HashMap<String, Script>>,
    calls: AtomicUsize,
}

impl ScriptedExtraction {
    pub fn script(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionService for ScriptedExtraction {
    async fn extract(&self, url: &str) -> Result<Extracted, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let format = DocumentFormat::from_url(url)?;
        let script = self.scripts.lock().unwrap().get(url).cloned();

        match script {
            Some(Script::Content { bytes, text }) => Ok(Extracted {
                text,
                content_hash: sha256_hex(&bytes),
                format,
            }),
            Some(Script::HttpStatus(status)) => Err(DownloadError::Status {
                url: url.to_string(),
                status,
            }
            .into()),
            Some(Script::EmptyText) => Err(ProcessError::EmptyText.into()),
            Some(Script::Panic) => panic!("extractor crashed on {}", url),
            Some(Script::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Err(DownloadError::Status {
                url: url.to_string(),
                status: 404,
            }
            .into()),
        }
    }
}

/// Notifier that records every notice and can be switched to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    failing: AtomicBool,
    sent: Mutex<Vec<(Uuid, Vec<String>)>>,
    attempts: AtomicUsize,
}

impl RecordingNotifier {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(Uuid, Vec<String>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_for(&self, upload_id: Uuid) -> usize {
        self.sent().iter().filter(|(id, _)| *id == upload_id).count()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipients: &[String], upload_id: Uuid) -> Result<usize, NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Send("connection refused".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((upload_id, recipients.to_vec()));
        Ok(recipients.len())
    }
}
