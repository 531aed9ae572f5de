use anyhow::Context;
use mediagate_core::{Config, TokenCodec};
use mediagate_processing::Thumbnailer;
use mediagate_storage::create_storage;
use mediagate_worker::{PgRecordStore, PipelineConfig, ThumbnailPipeline};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

fn init_tracing() {
    let console_fmt = tracing_subscriber::fmt::layer().event_format(
        Format::default()
            .compact()
            .with_target(false)
            .without_time(),
    );
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "mediagate=debug".into()))
        .with(console_fmt)
        .init();
}

/// Signal handler for graceful shutdown
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM signals to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_tracing();

    let config = Config::from_env()?;
    let codec = TokenCodec::new(config.jwt_secret.clone());

    let storage = create_storage(&config, codec)
        .await
        .context("Failed to initialize storage backend")?;

    // Startup is fatal without a database; the worker has nothing to poll.
    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set for the thumbnail worker")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let records = Arc::new(PgRecordStore::new(pool));
    let thumbnailer = Thumbnailer::new(config.thumb_max_edge);
    let pipeline = ThumbnailPipeline::new(
        records,
        storage,
        thumbnailer,
        PipelineConfig {
            batch_size: config.thumb_batch_size,
            poll_delay: Duration::from_millis(config.thumb_poll_delay_ms),
            max_attempts: config.thumb_max_attempts,
        },
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutting down gracefully...");
        signal_cancel.cancel();
    });

    pipeline.run(cancel).await;

    Ok(())
}
