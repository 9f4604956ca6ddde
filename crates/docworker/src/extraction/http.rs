use async_trait::async_trait;

use crate::config::ExtractionConfig;
use crate::error::DownloadError;
use crate::extraction::{sha256_hex, Extracted, ExtractionError, ExtractionService};
use crate::processor::{DocumentFormat, ProcessorRegistry};
use crate::sanitize::redact_url;

/// Downloads documents over HTTP(S) and extracts their text.
pub struct HttpExtractionService {
    client: reqwest::Client,
    registry: ProcessorRegistry,
    max_content_mb: u64,
    max_content_bytes: u64,
}

impl HttpExtractionService {
    pub fn new(config: &ExtractionConfig) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(DownloadError::Client)?;

        let registry = ProcessorRegistry::new(
            config.antiword_path.clone(),
            config.message_timeout(),
        );

        Ok(Self {
            client,
            registry,
            max_content_mb: config.max_content_mb,
            max_content_bytes: config.max_content_bytes(),
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let redacted = redact_url(url);
        let parsed =
            reqwest::Url::parse(url).map_err(|_| DownloadError::InvalidUrl(redacted.clone()))?;

        let request_error = |e: reqwest::Error| DownloadError::Request {
            url: redacted.clone(),
            source: e.without_url(),
        };

        let mut response = self.client.get(parsed).send().await.map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: redacted.clone(),
                status: status.as_u16(),
            });
        }

        let too_large = DownloadError::TooLarge {
            limit_mb: self.max_content_mb,
        };

        let declared = response.content_length().unwrap_or(0);
        if declared > self.max_content_bytes {
            return Err(too_large);
        }

        let mut body = Vec::with_capacity(declared as usize);
        while let Some(chunk) = response.chunk().await.map_err(request_error)? {
            if (body.len() + chunk.len()) as u64 > self.max_content_bytes {
                return Err(too_large);
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[async_trait]
impl ExtractionService for HttpExtractionService {
    async fn extract(&self, url: &str) -> Result<Extracted, ExtractionError> {
        // Unsupported formats fail before spending a download on them.
        let format = DocumentFormat::from_url(url)?;

        let bytes = self.download(url).await?;
        let content_hash = sha256_hex(&bytes);
        tracing::debug!(
            format = %format,
            bytes = bytes.len(),
            hash = %content_hash,
            "Downloaded document"
        );

        let text = self.registry.extract(format, bytes).await?;

        Ok(Extracted {
            text,
            content_hash,
            format,
        })
    }
}
