pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod notify;
pub mod pipeline;
pub mod processor;
pub mod sanitize;

pub use broker::{BrokerError, JobConsumer};
pub use config::{load_config, WorkerConfig};
pub use db::{Database, DocumentStore, SqlDocumentStore};
pub use error::{ConfigError, DownloadError, ProcessError, Result, WorkerError};
pub use extraction::{Extracted, ExtractionError, ExtractionService, HttpExtractionService};
pub use notify::{Notifier, NotifyError, SmtpNotifier};
pub use pipeline::{HandleOutcome, JobMessage, Pipeline};
