// Harvest daemon entry point.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use harvester_core::adapters::default_roster;
use harvester_core::{HarvesterConfig, HarvesterService, Orchestrator, Scheduler, Store, Transport};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,harvester_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting career-page harvester");

    let config = HarvesterConfig::from_env().context("Failed to load configuration")?;

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("invalid DATABASE_URL '{}'", config.database_url))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let store = Store::new(pool, config.max_page_size);
    let transport = Arc::new(Transport::new(&config)?);
    let registry = Arc::new(default_roster().context("Failed to build adapter roster")?);
    tracing::info!(adapters = registry.len(), "Adapter roster ready");

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        transport,
        registry,
        config.job_cache_grace,
    ));
    let service = HarvesterService::new(store.clone(), Arc::clone(&orchestrator));
    for adapter in service.get_available_adapters() {
        tracing::debug!(
            identifier = %adapter.identifier,
            company = %adapter.company,
            "registered adapter"
        );
    }

    let mut scheduler = Scheduler::new(
        orchestrator,
        store,
        config.schedule_times.clone(),
        config.retention_days,
    )
    .start()
    .await
    .context("Failed to start scheduler")?;

    tracing::info!(
        slots = config.schedule_times.len(),
        "Harvester running, waiting for shutdown signal"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down");
    scheduler
        .shutdown()
        .await
        .context("Failed to stop scheduler")?;

    Ok(())
}
