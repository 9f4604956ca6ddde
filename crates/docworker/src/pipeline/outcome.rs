use std::fmt;

use uuid::Uuid;

/// Result of handling one delivery. Every variant is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The document is PROCESSED. `reused` is set when its text came from an
    /// earlier document with identical bytes.
    Processed {
        document_id: Uuid,
        upload_id: Uuid,
        reused: bool,
    },
    /// Download or extraction failed; the document is in ERROR.
    TerminalError {
        document_id: Uuid,
        upload_id: Uuid,
        message: String,
    },
    /// The body is not a valid job.
    ParseFailure { reason: String },
    /// Anything else, including a panic inside the handler.
    Unexpected {
        document_id: Option<Uuid>,
        error: String,
    },
}

impl HandleOutcome {
    pub fn document_id(&self) -> Option<Uuid> {
        match self {
            Self::Processed { document_id, .. } | Self::TerminalError { document_id, .. } => {
                Some(*document_id)
            }
            Self::ParseFailure { .. } => None,
            Self::Unexpected { document_id, .. } => *document_id,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Processed { reused: true, .. } => "reused",
            Self::Processed { reused: false, .. } => "processed",
            Self::TerminalError { .. } => "error",
            Self::ParseFailure { .. } => "parse_failure",
            Self::Unexpected { .. } => "unexpected",
        }
    }

    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::ParseFailure { .. })
    }
}

impl fmt::Display for HandleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processed { document_id, .. } => write!(f, "{} doc={}", self.label(), document_id),
            Self::TerminalError {
                document_id,
                message,
                ..
            } => write!(f, "error doc={}: {}", document_id, message),
            Self::ParseFailure { reason } => write!(f, "parse_failure: {}", reason),
            Self::Unexpected { document_id, error } => match document_id {
                Some(id) => write!(f, "unexpected doc={}: {}", id, error),
                None => write!(f, "unexpected: {}", error),
            },
        }
    }
}
