use alloy_primitives::Address;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

const ENV_PREFIX: &str = "BOUNTY";

/// Worker settings, read from `BOUNTY_*` environment variables over defaults
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub base_rpc_url: String,
    pub secondary_rpc_url: String,
    pub data_dir: PathBuf,
    pub pipelines_path: Option<PathBuf>,
    pub operations_path: Option<PathBuf>,
    pub funding_wallets_path: Option<PathBuf>,
    pub farming_wallets_path: Option<PathBuf>,
    pub transactions_path: Option<PathBuf>,
    /// Postgres ledger when set, JSON-lines file otherwise
    pub database_url: Option<String>,
    pub tick_interval_secs: u64,
    /// Upper bound on any single JSON-RPC request
    pub rpc_timeout_secs: u64,
    pub bridge_contract: Option<String>,
    pub swap_contract: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("base_rpc_url", "https://eth.llamarpc.com")?
            .set_default("secondary_rpc_url", "https://mainnet.era.zksync.io")?
            .set_default("data_dir", "data")?
            .set_default("tick_interval_secs", 1000)?
            .set_default("rpc_timeout_secs", 30)?
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn pipelines_path(&self) -> PathBuf {
        self.pipelines_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("pipelines").join("pipelines.json"))
    }

    pub fn operations_path(&self) -> PathBuf {
        self.operations_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("pipelines").join("operations.json"))
    }

    pub fn funding_wallets_path(&self) -> PathBuf {
        self.funding_wallets_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("wallets").join("funding_wallets.json"))
    }

    pub fn farming_wallets_path(&self) -> PathBuf {
        self.farming_wallets_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("wallets").join("farming_wallets.json"))
    }

    pub fn transactions_path(&self) -> PathBuf {
        self.transactions_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("transactions.jsonl"))
    }

    pub fn pid_path(&self) -> PathBuf {
        self.data_dir.join("worker.pid")
    }

    pub fn bridge_contract(&self) -> AppResult<Option<Address>> {
        parse_address(self.bridge_contract.as_deref())
    }

    pub fn swap_contract(&self) -> AppResult<Option<Address>> {
        parse_address(self.swap_contract.as_deref())
    }
}

fn parse_address(raw: Option<&str>) -> AppResult<Option<Address>> {
    raw.map(|raw| {
        Address::from_str(raw.trim())
            .map_err(|e| AppError::InvalidAddress(format!("{}: {}", raw, e)))
    })
    .transpose()
}
