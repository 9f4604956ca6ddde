//! Extraction worker binary.
//!
//! Configured entirely through environment variables; see `config::loader`.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use docworker::config::{LogFormat, LoggingConfig};
use docworker::{
    load_config, Database, HttpExtractionService, JobConsumer, Pipeline, SmtpNotifier,
    SqlDocumentStore, WorkerConfig,
};
use secrecy::ExposeSecret;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("docworker: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("docworker: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("docworker stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: WorkerConfig) -> docworker::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting docworker");

    let db = Database::connect(config.database_url.expose_secret()).await?;
    let store = Arc::new(SqlDocumentStore::new(
        db,
        Duration::from_secs(config.notify_claim_lease_secs),
    ));
    let extraction = Arc::new(HttpExtractionService::new(&config.extraction)?);
    let notifier = Arc::new(SmtpNotifier::new(&config.mail)?);

    let pipeline = Arc::new(Pipeline::new(
        store,
        extraction,
        notifier,
        config.extraction.message_timeout(),
    ));

    JobConsumer::new(config.broker, pipeline)
        .run(shutdown_signal())
        .await?;

    Ok(())
}

/// Routes `log` records into tracing, then installs an env-filtered text or
/// JSON formatter.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_new(&logging.level)?;
    let (text, json) = match logging.format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown requested, finishing in-flight messages");
}
