use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("Could not connect to the broker after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}
