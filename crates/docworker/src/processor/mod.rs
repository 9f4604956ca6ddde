//! Per-format text extraction over in-memory document bytes.

pub mod doc;
pub mod docx;
pub mod pdf;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ProcessError;

/// Document formats the worker can turn into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Doc,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            _ => None,
        }
    }

    /// Picks the format from the extension of the URL's path.
    ///
    /// The query string and fragment are ignored, so presigned URLs such as
    /// `.../report.PDF?X-Amz-Signature=...` resolve to `Pdf`.
    pub fn from_url(url: &str) -> Result<Self, ProcessError> {
        let path = match reqwest::Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
        };

        let file_name = path.rsplit('/').next().unwrap_or_default();
        let extension = match file_name.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => "",
        };

        Self::from_extension(extension)
            .ok_or_else(|| ProcessError::UnsupportedFormat(extension.to_ascii_lowercase()))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Turns the raw bytes of one document format into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ProcessError>;
    fn supports(&self, format: DocumentFormat) -> bool;
}

pub struct ProcessorRegistry {
    extractors: Vec<Arc<dyn TextExtractor>>,
    doc: doc::DocExtractor,
}

impl ProcessorRegistry {
    pub fn new(antiword_path: impl Into<String>, doc_timeout: Duration) -> Self {
        let extractors: Vec<Arc<dyn TextExtractor>> = vec![
            Arc::new(pdf::PdfExtractor::new()),
            Arc::new(docx::DocxExtractor::new()),
        ];

        Self {
            extractors,
            doc: doc::DocExtractor::new(antiword_path, doc_timeout),
        }
    }

    /// Extracts text and trims it. Whitespace-only output is an error since
    /// it usually means a scanned document without a text layer.
    ///
    /// In-process parsers run on the blocking pool; `.doc` goes through the
    /// external converter.
    pub async fn extract(
        &self,
        format: DocumentFormat,
        bytes: Vec<u8>,
    ) -> Result<String, ProcessError> {
        let text = match format {
            DocumentFormat::Doc => self.doc.extract(&bytes).await?,
            _ => {
                let extractor = self
                    .extractors
                    .iter()
                    .find(|e| e.supports(format))
                    .cloned()
                    .ok_or_else(|| ProcessError::UnsupportedFormat(format.to_string()))?;

                tokio::task::spawn_blocking(move || extractor.extract(&bytes))
                    .await
                    .map_err(|e| ProcessError::Aborted(e.to_string()))??
            }
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ProcessError::EmptyText);
        }

        Ok(trimmed.to_string())
    }
}
