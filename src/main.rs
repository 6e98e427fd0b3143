//! Itemlist server binary

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use itemlist::api::{create_router, AppState};
use itemlist::config::{AppConfig, LogFormat};
use itemlist::storage::{create_storage, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config)?;

    let storage_config = config
        .storage_runtime()
        .context("invalid storage configuration")?;
    tracing::info!(?storage_config, "Opening item storage");

    let storage: Arc<dyn StorageBackend> = Arc::from(
        create_storage(storage_config).context("failed to initialise storage backend")?,
    );

    let router = create_router(AppState::with_storage(storage));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!(%addr, "Listening for HTTP traffic");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("itemlist=info,tower_http=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        LogFormat::Text => {
            registry.with(tracing_subscriber::fmt::layer()).try_init()?;
        }
    }

    Ok(())
}
