pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from};
pub use schema::{
    BrokerConfig, ExtractionConfig, LogFormat, LoggingConfig, MailConfig, WorkerConfig,
};
