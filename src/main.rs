mod app;
mod config;
mod db;
mod errors;
mod external;
mod jobs;
mod logging;
mod models;
mod routes;
mod services;
mod state;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::external::amadeus::AmadeusSource;
use crate::external::price_source::PriceSource;
use crate::logging::{init_logging, LoggingConfig};
use crate::services::job_scheduler_service::{JobContext, JobSchedulerService};
use crate::services::notifier::{Notifier, SmtpNotifier};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(&LoggingConfig::from_env());

    let settings = Settings::from_env();

    let connect_options = SqliteConnectOptions::from_str(&settings.database_url)
        .with_context(|| format!("invalid DATABASE_URL '{}'", settings.database_url))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .context("failed to open database")?;

    db::init_schema(&pool).await.context("failed to init schema")?;

    let price_source: Arc<dyn PriceSource> = Arc::new(
        AmadeusSource::from_env().context("failed to create Amadeus price source")?,
    );
    tracing::info!("📊 Using price source: {}", price_source.name());

    let notifier: Arc<dyn Notifier> = Arc::new(SmtpNotifier::from_env());
    let shutdown = Arc::new(AtomicBool::new(false));

    let context = JobContext {
        pool: pool.clone(),
        price_source: price_source.clone(),
        notifier: notifier.clone(),
        settings: settings.clone(),
        shutdown: shutdown.clone(),
    };

    let mut scheduler = JobSchedulerService::new(context)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let state = AppState {
        pool,
        price_source,
        notifier,
        settings: settings.clone(),
    };
    let app = app::create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("🚀 Farewatch running at http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            shutdown.store(true, Ordering::Relaxed);
        })
        .await?;

    let _ = scheduler.stop().await;
    Ok(())
}
