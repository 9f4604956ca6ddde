use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{info, warn};
use uuid::Uuid;

use crate::config::MailConfig;

use super::{notification_body, Notifier, NotifyError};

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends notices through an SMTP relay.
///
/// Recipients go in `Bcc` so users do not see each other's addresses; the
/// visible `To` is the sender itself.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    subject: String,
}

impl SmtpNotifier {
    /// Builds an unauthenticated, plaintext relay client for `MAIL_HOST:MAIL_PORT`.
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let from = parse_sender(&config.from)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from,
            subject: config.subject.clone(),
        })
    }
}

fn parse_sender(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidSender {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Parses recipients, skipping addresses that are not valid mailboxes.
fn parse_recipients(recipients: &[String]) -> Vec<Mailbox> {
    recipients
        .iter()
        .filter_map(|raw| match raw.trim().parse::<Mailbox>() {
            Ok(mailbox) => Some(mailbox),
            Err(e) => {
                warn!("Skipping invalid recipient address '{}': {}", raw, e);
                None
            }
        })
        .collect()
}

fn build_message(
    from: &Mailbox,
    subject: &str,
    recipients: &[Mailbox],
    upload_id: Uuid,
) -> Result<Message, NotifyError> {
    let mut builder = Message::builder()
        .from(from.clone())
        .to(from.clone())
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);

    for recipient in recipients {
        builder = builder.bcc(recipient.clone());
    }

    builder
        .body(notification_body(upload_id))
        .map_err(|e| NotifyError::Build(e.to_string()))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, recipients: &[String], upload_id: Uuid) -> Result<usize, NotifyError> {
        let mailboxes = parse_recipients(recipients);
        if mailboxes.is_empty() {
            info!("No recipients for upload {}, nothing to send", upload_id);
            return Ok(0);
        }

        let message = build_message(&self.from, &self.subject, &mailboxes, upload_id)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Send(e.to_string()))?;

        Ok(mailboxes.len())
    }
}
