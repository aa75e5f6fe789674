use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// The two networks the worker moves funds across.
///
/// `Base` is the settlement network funding identities hold their balance on;
/// `Secondary` is the rollup where farming identities swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    #[serde(rename = "BaseNetwork", alias = "ETH", alias = "ETHEREUM_MAINNET")]
    Base,
    #[serde(rename = "SecondaryNetwork", alias = "ZKSYNC", alias = "ZKSYNC_MAINNET")]
    Secondary,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Network {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "BaseNetwork" | "ETH" | "ETHEREUM_MAINNET" => Ok(Network::Base),
            "SecondaryNetwork" | "ZKSYNC" | "ZKSYNC_MAINNET" => Ok(Network::Secondary),
            other => Err(AppError::InvalidInput(format!("Unknown network id: {}", other))),
        }
    }
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Base => "BaseNetwork",
            Network::Secondary => "SecondaryNetwork",
        }
    }

    pub fn native_asset(&self) -> Asset {
        Asset::Eth
    }
}

/// Assets the workflows know about. Only the native asset is movable today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Eth,
    Usdt,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Asset::Eth => "ETH",
            Asset::Usdt => "USDT",
        };
        write!(f, "{}", symbol)
    }
}

/// A bridging route between the two networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeRoute {
    pub from: Network,
    pub to: Network,
    pub asset: Asset,
}

impl BridgeRoute {
    pub fn new(from: Network, to: Network, asset: Asset) -> Self {
        Self { from, to, asset }
    }

    /// The one route deposits are implemented for
    pub fn native_deposit() -> Self {
        Self::new(Network::Base, Network::Secondary, Asset::Eth)
    }

    /// Explicit whitelist of supported routes
    pub fn is_supported(&self) -> bool {
        matches!(
            (self.from, self.to, self.asset),
            (Network::Base, Network::Secondary, Asset::Eth)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Confirmed,
    Failed,
    Timeout,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Confirmed => "confirmed",
            TxStatus::Failed => "failed",
            TxStatus::Timeout => "timeout",
        }
    }
}

/// One row of the append-only transaction ledger.
///
/// A record is written per submitted transaction, so a bridge workflow
/// produces two: the source deposit and the derived destination transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub operation_id: Option<i64>,
    pub network: Network,
    pub from_address: String,
    pub to_address: String,
    pub sent_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub tx_hash: String,
    pub status: TxStatus,
    pub details: serde_json::Value,
}

impl TransactionRecord {
    pub fn new(
        operation_id: Option<i64>,
        network: Network,
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        amount: Decimal,
        tx_hash: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation_id,
            network,
            from_address: from_address.into(),
            to_address: to_address.into(),
            sent_at,
            completed_at: None,
            amount,
            tx_hash: tx_hash.into(),
            status: TxStatus::Confirmed,
            details: serde_json::Value::Null,
        }
    }

    pub fn completed(mut self, status: TxStatus) -> Self {
        self.completed_at = Some(Utc::now());
        self.status = status;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}
