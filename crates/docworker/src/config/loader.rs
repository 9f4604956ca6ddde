use std::str::FromStr;

use secrecy::SecretString;

use crate::config::schema::{
    BrokerConfig, ExtractionConfig, LogFormat, LoggingConfig, MailConfig, WorkerConfig,
    DEFAULT_BROKER_URL, DEFAULT_DB_CONN, DEFAULT_QUEUE,
};
use crate::error::ConfigError;

/// Loads the worker configuration from the process environment.
pub fn load_config() -> Result<WorkerConfig, ConfigError> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Loads the worker configuration from an arbitrary key lookup.
///
/// Empty values are treated as unset so that `FOO=` in a compose file falls
/// back to the default.
pub fn load_config_from<F>(lookup: F) -> Result<WorkerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let extraction_defaults = ExtractionConfig::default();
    let mail_defaults = MailConfig::default();

    let config = WorkerConfig {
        database_url: SecretString::from(
            get("DB_CONN").unwrap_or_else(|| DEFAULT_DB_CONN.to_string()),
        ),
        broker: BrokerConfig {
            url: SecretString::from(
                get("BROKER_URL").unwrap_or_else(|| DEFAULT_BROKER_URL.to_string()),
            ),
            queue: get("QUEUE_EXTRACT").unwrap_or_else(|| DEFAULT_QUEUE.to_string()),
            prefetch: parse_or(&get, "PREFETCH", 1)?,
            concurrency: parse_or(&get, "WORKER_CONCURRENCY", 1)?,
            connect_max_attempts: parse_or(&get, "CONNECT_MAX_ATTEMPTS", 10)?,
            dead_letter_queue: get("DEAD_LETTER_QUEUE"),
        },
        extraction: ExtractionConfig {
            request_timeout_secs: parse_or(
                &get,
                "REQUEST_TIMEOUT",
                extraction_defaults.request_timeout_secs,
            )?,
            max_content_mb: parse_or(&get, "MAX_CONTENT_MB", extraction_defaults.max_content_mb)?,
            message_timeout_secs: parse_or(
                &get,
                "MESSAGE_TIMEOUT",
                extraction_defaults.message_timeout_secs,
            )?,
            antiword_path: get("ANTIWORD_PATH").unwrap_or(extraction_defaults.antiword_path),
        },
        mail: MailConfig {
            host: get("MAIL_HOST").unwrap_or(mail_defaults.host),
            port: parse_or(&get, "MAIL_PORT", mail_defaults.port)?,
            from: get("MAIL_FROM").unwrap_or(mail_defaults.from),
            subject: get("MAIL_SUBJECT").unwrap_or(mail_defaults.subject),
        },
        logging: LoggingConfig {
            level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format: match get("LOG_FORMAT") {
                Some(value) => parse_log_format(&value)?,
                None => LogFormat::Text,
            },
        },
        notify_claim_lease_secs: parse_or(&get, "NOTIFY_CLAIM_LEASE", 300)?,
    };

    validate_config(&config)?;

    Ok(config)
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue {
                name,
                value: raw.clone(),
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "text" | "pretty" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        _ => Err(ConfigError::InvalidValue {
            name: "LOG_FORMAT",
            value: value.to_string(),
            reason: "expected 'text' or 'json'".to_string(),
        }),
    }
}

fn validate_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    let positive: [(&str, u64); 6] = [
        ("PREFETCH", config.broker.prefetch as u64),
        ("WORKER_CONCURRENCY", config.broker.concurrency as u64),
        ("CONNECT_MAX_ATTEMPTS", config.broker.connect_max_attempts as u64),
        ("REQUEST_TIMEOUT", config.extraction.request_timeout_secs),
        ("MAX_CONTENT_MB", config.extraction.max_content_mb),
        ("MESSAGE_TIMEOUT", config.extraction.message_timeout_secs),
    ];

    for (name, value) in positive {
        if value == 0 {
            return Err(ConfigError::Validation {
                message: format!("{} must be greater than 0", name),
            });
        }
    }

    if config.broker.queue.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "QUEUE_EXTRACT must not be empty".to_string(),
        });
    }

    if config.broker.dead_letter_queue.as_deref() == Some(config.broker.queue.as_str()) {
        return Err(ConfigError::Validation {
            message: "DEAD_LETTER_QUEUE must differ from QUEUE_EXTRACT".to_string(),
        });
    }

    if !config.mail.from.contains('@') {
        return Err(ConfigError::Validation {
            message: format!("MAIL_FROM is not an email address: {}", config.mail.from),
        });
    }

    Ok(())
}
