mod adapters;
mod bootstrap;
mod config;
mod error;
mod execution;
mod io;
mod ledger;
mod operations;
mod scheduler;
mod wallet;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,bountybot=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting bountybot worker");

    let config = config::Config::from_env().context("failed to load configuration")?;
    let worker = bootstrap::initialize_worker(&config)
        .await
        .context("failed to initialize worker")?;

    worker.scheduler.run().await?;

    info!("👋 Worker stopped");
    Ok(())
}
