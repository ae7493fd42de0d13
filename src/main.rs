//! Contribution Log Server - Binary Entry Point
//!
//! This is the main entry point for the contribution-server binary.

use std::sync::Arc;

use contribution_log::api::{auth::JwtAuth, create_router, AppState};
use contribution_log::{AppConfig, ContributionStore};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type MainResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> MainResult<()> {
    init_logging();

    let config = AppConfig::from_env()?;
    let auth = JwtAuth::from_env()?;

    info!(
        "Starting {} {} on {}",
        contribution_log::NAME,
        contribution_log::VERSION,
        config.bind
    );
    info!("  Database: {}", config.store.database_url);
    info!("  Bot accounts: {}", config.store.bot_user_ids.len());
    info!("  Row estimator: {:?}", config.store.row_estimator);
    info!("  Statistics refresh: {:?}", config.stats_refresh);

    let store = Arc::new(ContributionStore::open(config.store.clone()).await?);

    let refresh = config.stats_refresh.map(|every| {
        let store = store.clone();
        tokio::spawn(async move { store.run_statistics_refresh(every).await })
    });
    let app = create_router(Arc::new(AppState::new(store.clone(), auth)));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = refresh {
        task.abort();
    }
    store.close().await;
    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("contribution_log=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
