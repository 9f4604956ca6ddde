//! Download, hash and text extraction for a single document URL.

mod http;

pub use http::HttpExtractionService;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{DownloadError, ProcessError};
use crate::processor::DocumentFormat;

/// Text extracted from one downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    /// SHA-256 of the raw downloaded bytes, lowercase hex.
    pub content_hash: String,
    pub format: DocumentFormat,
}

/// Terminal extraction failures. Both variants leave the document in ERROR.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] ProcessError),
}

impl ExtractionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Download(_) => "download",
            Self::Extract(_) => "extract",
        }
    }
}

#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn extract(&self, url: &str) -> Result<Extracted, ExtractionError>;
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    hex::encode(Sha256::digest(bytes))
}
