use sqlx::{postgres::PgPoolOptions, PgPool};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::dex::{IzumiSwapProvider, SwapConfig};
use crate::config::Config;
use crate::error::{AppError, AppResult, StoreError};
use crate::execution::bridge::{BridgeConfig, BridgeProvider};
use crate::execution::native::{NativeTransferConfig, NativeTransferProvider};
use crate::execution::rpc::{ChainClient, HttpChainClient};
use crate::io::atomic_write;
use crate::ledger::models::Network;
use crate::ledger::{FileTransactionLedger, PgTransactionLedger, TransactionLedger};
use crate::operations::{OperationDispatcher, OperationRegistry, WorkflowConfig};
use crate::scheduler::{PipelineStore, Scheduler, SchedulerConfig};
use crate::wallet::{AccountManager, IdentityTable, WalletRole};

/// Everything the worker needs, constructed once
pub struct Worker {
    pub scheduler: Scheduler,
    _pid: PidFile,
}

pub async fn initialize_worker(config: &Config) -> AppResult<Worker> {
    info!("Initializing worker components ...");

    let pid = PidFile::acquire(config.pid_path())?;

    // Fail before touching any network if nothing can be dispatched.
    let registry = OperationRegistry::load(config.operations_path())?;
    info!("✅ Operation registry ready ({} operations)", registry.len());

    let ledger: Arc<dyn TransactionLedger> = match &config.database_url {
        Some(url) => {
            let pool = initialize_database(url).await?;
            info!("✅ Postgres transaction ledger");
            Arc::new(PgTransactionLedger::new(pool))
        }
        None => {
            let path = config.transactions_path();
            info!("✅ File transaction ledger at {}", path.display());
            Arc::new(FileTransactionLedger::new(path))
        }
    };

    let base: Arc<dyn ChainClient> = Arc::new(HttpChainClient::new(
        Network::Base,
        &config.base_rpc_url,
        config.rpc_timeout(),
    )?);
    let secondary: Arc<dyn ChainClient> = Arc::new(HttpChainClient::new(
        Network::Secondary,
        &config.secondary_rpc_url,
        config.rpc_timeout(),
    )?);
    info!(
        "⚙️  RPC endpoints: {} ({}), {} ({})",
        Network::Base,
        config.base_rpc_url,
        Network::Secondary,
        config.secondary_rpc_url
    );

    let funding = Arc::new(AccountManager::new(
        WalletRole::Funding,
        IdentityTable::new(config.funding_wallets_path()),
        base.clone(),
    ));
    let farming = Arc::new(AccountManager::new(
        WalletRole::Farming,
        IdentityTable::new(config.farming_wallets_path()),
        secondary.clone(),
    ));
    if funding.is_empty() {
        warn!("⚠️  No funding identities - generate_wallet and transfer operations will fail");
    }
    info!(
        "✅ Account managers loaded ({} funding, {} farming)",
        funding.len(),
        farming.len()
    );

    let mut bridge_config = BridgeConfig::default();
    if let Some(contract) = config.bridge_contract()? {
        bridge_config.main_contract = contract;
    }
    let bridge = Arc::new(BridgeProvider::new(
        bridge_config,
        base.clone(),
        secondary.clone(),
        ledger.clone(),
    ));

    let mut swap_config = SwapConfig::default();
    if let Some(contract) = config.swap_contract()? {
        swap_config.swap_contract = contract;
    }
    let swap = Arc::new(IzumiSwapProvider::new(
        swap_config,
        secondary.clone(),
        ledger.clone(),
    ));

    let transfer = Arc::new(NativeTransferProvider::new(
        NativeTransferConfig::default(),
        base.clone(),
        ledger.clone(),
    ));
    info!("✅ Chain providers registered");

    let dispatcher = Arc::new(OperationDispatcher::new(
        WorkflowConfig::default(),
        funding,
        farming,
        bridge,
        swap,
        transfer,
    ));

    let scheduler = Scheduler::new(
        SchedulerConfig {
            tick_interval: config.tick_interval(),
            operations_path: registry.path().to_path_buf(),
        },
        PipelineStore::new(config.pipelines_path()),
        dispatcher,
    );
    info!("✅ Scheduler ready (tick every {:?})", config.tick_interval());

    Ok(Worker {
        scheduler,
        _pid: pid,
    })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await?;

    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}

/// Pid file that refuses a second live worker on the same data directory.
///
/// Removed again when dropped.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn acquire(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();

        if let Some(pid) = read_pid(&path) {
            if pid != std::process::id() && process_alive(pid) {
                return Err(AppError::Config(format!(
                    "worker already running with pid {} ({})",
                    pid,
                    path.display()
                )));
            }
            warn!("Removing stale pid file {} (pid {})", path.display(), pid);
        }

        atomic_write(&path, std::process::id().to_string().as_bytes())?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(source) = std::fs::remove_file(&self.path) {
            let e = StoreError::Write {
                path: self.path.clone(),
                source,
            };
            warn!("Failed to remove pid file: {}", e);
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}
