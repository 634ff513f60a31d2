//! # Tuma Application
//!
//! Binary that wires together the engine's adapters and runs the outbox
//! dispatcher:
//! - Load configuration from environment
//! - Initialize the SQLite store
//! - Build the settlement service over the store-backed ports
//! - Deliver pending events to the settlement worker

mod config;
mod dispatcher;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tuma_engine::SettlementService;
use tuma_store::{SqliteLimitPolicy, SqliteStore, SystemClock};
use tuma_types::{Clock, DailyLimitPolicy, EventPublisher, LedgerRepository, TransactionRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tuma_app=debug,tuma_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting Tuma dispatcher");
    tracing::info!("Using database: {}", config.database_url);

    // Build the store (handles connection and migration)
    let store = Arc::new(SqliteStore::new(&config.database_url).await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let policy: Arc<dyn DailyLimitPolicy> = Arc::new(SqliteLimitPolicy::new(
        store.pool().clone(),
        clock.clone(),
        config.deposit_cap_kes_cents,
        config.withdrawal_cap_usd_cents,
    ));

    let transactions: Arc<dyn TransactionRepository> = store.clone();
    let ledger: Arc<dyn LedgerRepository> = store.clone();
    let publisher: Arc<dyn EventPublisher> = store.clone();
    let settlement = Arc::new(SettlementService::new(
        transactions,
        ledger,
        policy,
        publisher,
        clock,
    ));

    let dispatcher = dispatcher::OutboxDispatcher::new(
        store,
        settlement,
        config.worker_url,
        Duration::from_secs(config.poll_interval_secs),
    );
    dispatcher.run().await;

    Ok(())
}
