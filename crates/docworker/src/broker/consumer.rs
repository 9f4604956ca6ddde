use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::acker::Acker;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use log::{error, info, warn};
use secrecy::ExposeSecret;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::BrokerConfig;
use crate::pipeline::{HandleOutcome, Pipeline};
use crate::sanitize::redact_url;

use super::{BrokerError, ExponentialBackoff};

/// AMQP delivery mode for messages that survive a broker restart.
const PERSISTENT: u8 = 2;

struct Session {
    connection: Connection,
    channel: Channel,
    consumer: Consumer,
}

enum SessionEnd {
    Shutdown,
    ConnectionLost(String),
}

/// Consumes job messages and feeds them to the [`Pipeline`].
///
/// Every delivery is acknowledged once its handler returns, whatever the
/// outcome. Up to `concurrency` handlers run at once; the broker keeps at most
/// `prefetch` deliveries unacknowledged.
pub struct JobConsumer {
    config: BrokerConfig,
    pipeline: Arc<Pipeline>,
    backoff: ExponentialBackoff,
}

impl JobConsumer {
    pub fn new(config: BrokerConfig, pipeline: Arc<Pipeline>) -> Self {
        let backoff = ExponentialBackoff::with_max_attempts(config.connect_max_attempts);
        Self {
            config,
            pipeline,
            backoff,
        }
    }

    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Consumes until `shutdown` resolves.
    ///
    /// Returns an error only when the broker stays unreachable for all
    /// connection attempts.
    pub async fn run<S>(&self, shutdown: S) -> Result<(), BrokerError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let session = tokio::select! {
                biased;
                _ = &mut shutdown => return Ok(()),
                session = self.connect_with_retry() => session?,
            };

            match self.consume(session, &mut shutdown).await {
                SessionEnd::Shutdown => {
                    info!("Consumer stopped");
                    return Ok(());
                }
                SessionEnd::ConnectionLost(reason) => {
                    warn!("Broker connection lost ({}), reconnecting", reason);
                }
            }
        }
    }

    async fn connect_with_retry(&self) -> Result<Session, BrokerError> {
        let max_attempts = self.backoff.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.open_session().await {
                Ok(session) => return Ok(session),
                Err(e) if attempt >= max_attempts => {
                    return Err(BrokerError::RetriesExhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    })
                }
                Err(e) => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        "Broker connection attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn open_session(&self) -> Result<Session, lapin::Error> {
        let url = self.config.url.expose_secret();
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        let durable = QueueDeclareOptions {
            durable: true,
            ..QueueDeclareOptions::default()
        };
        channel
            .queue_declare(&self.config.queue, durable, FieldTable::default())
            .await?;
        if let Some(dlq) = &self.config.dead_letter_queue {
            channel
                .queue_declare(dlq, durable, FieldTable::default())
                .await?;
        }

        channel
            .basic_qos(self.config.prefetch, BasicQosOptions::default())
            .await?;

        let consumer = channel
            .basic_consume(
                &self.config.queue,
                &format!("docworker-{}", uuid::Uuid::new_v4()),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(
            "Connected to {} and waiting for messages on '{}'",
            redact_url(url),
            self.config.queue
        );

        Ok(Session {
            connection,
            channel,
            consumer,
        })
    }

    async fn consume<S>(&self, session: Session, shutdown: &mut std::pin::Pin<&mut S>) -> SessionEnd
    where
        S: Future<Output = ()>,
    {
        let Session {
            connection,
            channel,
            mut consumer,
        } = session;

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut handlers = JoinSet::new();

        let end = loop {
            let permit = tokio::select! {
                biased;
                _ = shutdown.as_mut() => break SessionEnd::Shutdown,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break SessionEnd::Shutdown,
                },
            };

            while let Some(finished) = handlers.try_join_next() {
                log_join_result(finished);
            }

            let delivery = tokio::select! {
                biased;
                _ = shutdown.as_mut() => break SessionEnd::Shutdown,
                next = consumer.next() => match next {
                    Some(Ok(delivery)) => delivery,
                    Some(Err(e)) => break SessionEnd::ConnectionLost(e.to_string()),
                    None => break SessionEnd::ConnectionLost("consumer cancelled".to_string()),
                },
            };

            let pipeline = Arc::clone(&self.pipeline);
            let channel = channel.clone();
            let dead_letter_queue = self.config.dead_letter_queue.clone();
            handlers.spawn(async move {
                let _permit = permit;
                handle_delivery(&pipeline, &channel, dead_letter_queue.as_deref(), delivery).await;
            });
        };

        if !handlers.is_empty() {
            info!("Waiting for {} in-flight message(s)", handlers.len());
        }
        while let Some(finished) = handlers.join_next().await {
            log_join_result(finished);
        }

        if let SessionEnd::Shutdown = end {
            // Closing returns unhandled prefetched deliveries to the queue.
            if let Err(e) = channel.close(200, "shutdown").await {
                warn!("Failed to close channel: {}", e);
            }
            if let Err(e) = connection.close(200, "shutdown").await {
                warn!("Failed to close connection: {}", e);
            }
        }

        end
    }
}

async fn handle_delivery(
    pipeline: &Pipeline,
    channel: &Channel,
    dead_letter_queue: Option<&str>,
    delivery: Delivery,
) {
    let outcome = pipeline.handle(&delivery.data).await;
    info!(
        "Message handled: {} (document {:?})",
        outcome,
        outcome.document_id()
    );

    let settler = ChannelSettler {
        channel,
        acker: &delivery.acker,
    };
    settle(&settler, &outcome, dead_letter_queue, &delivery.data).await;
}

/// Broker-side effects of finishing one delivery.
#[async_trait]
trait DeliverySettler: Send + Sync {
    async fn dead_letter(&self, queue: &str, body: &[u8]) -> Result<(), lapin::Error>;
    async fn ack(&self) -> Result<(), lapin::Error>;
}

struct ChannelSettler<'a> {
    channel: &'a Channel,
    acker: &'a Acker,
}

#[async_trait]
impl DeliverySettler for ChannelSettler<'_> {
    async fn dead_letter(&self, queue: &str, body: &[u8]) -> Result<(), lapin::Error> {
        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_delivery_mode(PERSISTENT),
            )
            .await?
            .await?;
        Ok(())
    }

    async fn ack(&self) -> Result<(), lapin::Error> {
        self.acker.ack(BasicAckOptions::default()).await
    }
}

/// Copies unparseable bodies to the dead-letter queue, then acknowledges.
/// The delivery is acknowledged whatever the outcome or publish result.
async fn settle(
    settler: &dyn DeliverySettler,
    outcome: &HandleOutcome,
    dead_letter_queue: Option<&str>,
    body: &[u8],
) {
    if outcome.is_parse_failure() {
        if let Some(queue) = dead_letter_queue {
            if let Err(e) = settler.dead_letter(queue, body).await {
                warn!("Could not dead-letter unparseable message: {}", e);
            }
        }
    }

    if let Err(e) = settler.ack().await {
        // The broker redelivers unacked messages; handling is idempotent.
        warn!("Failed to acknowledge message: {}", e);
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!("Message handler task failed: {}", e);
    }
}
