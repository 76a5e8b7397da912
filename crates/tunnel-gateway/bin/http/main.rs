mod cli;

use crate::cli::{LogFormat, StorageBackendArg, CLI};
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tunnel_core::Store;
use tunnel_gateway::{App, AppState};
use tunnel_generator::RandomGenerator;
use tunnel_shortener::{DeletionPipeline, RetryPolicy, ShortenerService};
use tunnel_storage::{FileStore, InMemoryStore, MySqlStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        short_code_length = config.short_code_length,
        "starting gateway"
    );

    let store = open_store(&config).await?;
    let shortener = ShortenerService::new(
        Arc::clone(&store),
        Arc::new(RandomGenerator::new(config.short_code_length)),
    );
    let deletion = DeletionPipeline::new(
        Arc::clone(&store),
        RetryPolicy::builder()
            .max_attempts(config.delete_max_attempts)
            .build(),
    );
    let app = App::router(AppState::new(
        shortener,
        deletion.clone(),
        config.base_url.clone(),
    ));

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    deletion.shutdown().await;
    store.close().await?;
    info!("gateway stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn open_store(config: &CLI) -> Result<Arc<dyn Store>, Box<dyn Error>> {
    let store: Arc<dyn Store> = match config.storage {
        StorageBackendArg::InMemory => Arc::new(InMemoryStore::new()),
        StorageBackendArg::File => {
            let path = config
                .file_storage_path
                .as_ref()
                .ok_or("file storage path is required when storage backend is file")?;
            Arc::new(FileStore::open(path)?)
        }
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .as_deref()
                .ok_or("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlStore::connect(dsn).await?;
            store.migrate().await?;
            Arc::new(store)
        }
    };

    Ok(store)
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
