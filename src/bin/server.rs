//! Binary entry point: load configuration, connect to the database, run
//! migrations, start the scheduler's long-lived workers, and serve the
//! external HTTP interface.

use std::sync::Arc;

use anyhow::{Context, Result};
use lei_sync_core::acquirer::{Acquirer, AcquirerConfig, DeltaWindow};
use lei_sync_core::scheduler::{Scheduler, SchedulerConfig};
use lei_sync_core::server::{build_router, AppState};
use lei_sync_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lei_sync_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting GLEIF LEI registry sync");

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!("configuration loaded");

    tracing::info!("connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    tracing::info!("database connected");

    tracing::info!("running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("migrations complete");

    let acquirer = Acquirer::new(AcquirerConfig {
        data_dir: config.data_dir.clone(),
        discovery_endpoint_url: config.discovery_endpoint_url.clone(),
        delta_window: DeltaWindow::default(),
        max_retries: 3,
    });

    let scheduler_config = SchedulerConfig::from_env();
    let scheduler = Arc::new(Scheduler::new(
        pool.clone(),
        acquirer,
        config.data_dir.clone(),
        scheduler_config,
    ));
    scheduler.start().await.context("failed to start scheduler")?;

    let app = build_router(AppState {
        pool: pool.clone(),
        scheduler: scheduler.clone(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind to address")?;

    let shutdown = scheduler.cancellation_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        })
        .await
        .context("server error")?;

    Ok(())
}
