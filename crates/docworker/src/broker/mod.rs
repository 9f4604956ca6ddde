//! AMQP consumption with reconnect.

mod backoff;
mod consumer;
mod error;

pub use backoff::ExponentialBackoff;
pub use consumer::JobConsumer;
pub use error::BrokerError;
