use thiserror::Error;

/// Why a job body could not be turned into a [`super::JobMessage`].
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Invalid job message: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid job message: Url is empty")]
    EmptyUrl,
}

/// Failures the handler does not anticipate. They end in
/// [`super::HandleOutcome::Unexpected`].
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database operation failed: {0}")]
    Database(#[from] crate::db::DatabaseError),
}
