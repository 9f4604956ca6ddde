use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MessageError;

/// One extraction job as published by the upload API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobMessage {
    pub document_id: Uuid,
    pub upload_id: Uuid,
    pub url: String,
}

impl JobMessage {
    pub fn parse(body: &[u8]) -> Result<Self, MessageError> {
        let message: Self = serde_json::from_slice(body)?;
        if message.url.trim().is_empty() {
            return Err(MessageError::EmptyUrl);
        }
        Ok(message)
    }
}

/// Identifiers recovered from a body that may not parse as a full job.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobIds {
    pub document_id: Option<Uuid>,
    pub upload_id: Option<Uuid>,
}

/// Best-effort lookup of `DocumentId` and `UploadId`, used when handling
/// failed after the body was read.
pub fn peek_ids(body: &[u8]) -> JobIds {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return JobIds::default();
    };

    let field = |name: &str| {
        value
            .get(name)
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    };

    JobIds {
        document_id: field("DocumentId"),
        upload_id: field("UploadId"),
    }
}
