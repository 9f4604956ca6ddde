//! Notification transport error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    /// The configured sender is not a valid mailbox.
    #[error("Invalid sender address '{address}': {reason}")]
    InvalidSender { address: String, reason: String },

    /// The message could not be assembled.
    #[error("Failed to build notification: {0}")]
    Build(String),

    /// The SMTP relay refused or dropped the message.
    #[error("SMTP send failed: {0}")]
    Send(String),
}
