//! API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use api::config::Config;
use api::{AppState, Storefront};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, PostgresStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S: Storefront>(
    store: S,
    metrics_handle: PrometheusHandle,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let state = Arc::new(AppState::new(store, config));
    let app = api::create_app(state, metrics_handle, config);

    let addr = config.addr();
    tracing::info!(%addr, upload_dir = %config.upload_dir.display(), "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url, config.db_max_connections).await?;
            store.run_migrations().await?;
            tracing::info!("connected to PostgreSQL, migrations applied");
            serve(store, metrics_handle, &config).await
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, data will not survive a restart");
            serve(InMemoryStore::new(), metrics_handle, &config).await
        }
    }
}
