//! Test harness wiring an in-memory database to a `Pipeline`.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use docworker::db::entities::document;
use docworker::db::{document_repo, user_repo, Database, SqlDocumentStore};
use docworker::pipeline::{HandleOutcome, JobMessage, Pipeline};

use super::fakes::{RecordingNotifier, Script, ScriptedExtraction};

pub struct TestHarness {
    pub db: Database,
    pub store: Arc<SqlDocumentStore>,
    pub extraction: Arc<ScriptedExtraction>,
    pub notifier: Arc<RecordingNotifier>,
    pub pipeline: Arc<Pipeline>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_message_timeout(Duration::from_secs(10)).await
    }

    pub async fn with_message_timeout(message_timeout: Duration) -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let store = Arc::new(SqlDocumentStore::new(db.clone(), Duration::from_secs(300)));
        let extraction = Arc::new(ScriptedExtraction::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            extraction.clone(),
            notifier.clone(),
            message_timeout,
        ));

        Self {
            db,
            store,
            extraction,
            notifier,
            pipeline,
        }
    }

    pub async fn add_user(&self, email: &str) {
        user_repo::insert(&self.db, email)
            .await
            .expect("Failed to insert user");
    }

    /// Inserts a QUEUED document and scripts its URL.
    pub async fn queue(&self, upload_id: Uuid, url: &str, script: Option<Script>) -> Uuid {
        let id = Uuid::new_v4();
        document_repo::insert_queued(&self.db, id, upload_id, url)
            .await
            .expect("Failed to insert document");
        if let Some(script) = script {
            self.extraction.script(url, script);
        }
        id
    }

    pub fn body(document_id: Uuid, upload_id: Uuid, url: &str) -> Vec<u8> {
        serde_json::to_vec(&JobMessage {
            document_id,
            upload_id,
            url: url.to_string(),
        })
        .expect("Failed to serialize job")
    }

    /// Delivers the job for an already queued document.
    pub async fn deliver(&self, document_id: Uuid) -> HandleOutcome {
        let doc = self.document(document_id).await;
        let body = Self::body(doc.id, doc.upload_id, &doc.source_url);
        self.pipeline.handle(&body).await
    }

    pub async fn document(&self, id: Uuid) -> document::Model {
        document_repo::find_by_id(&self.db, id)
            .await
            .expect("Failed to load document")
            .expect("Document does not exist")
    }
}
