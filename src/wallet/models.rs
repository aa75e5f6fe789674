use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppResult;
use crate::ledger::models::Network;
use crate::wallet::keys::LocalKey;
use alloy_primitives::Address;

/// Which side of the workflow an identity table serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletRole {
    Funding,
    Farming,
}

impl WalletRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletRole::Funding => "funding",
            WalletRole::Farming => "farming",
        }
    }

    /// Network whose balance `get_balance` reports for this role
    pub fn balance_network(&self) -> Network {
        match self {
            WalletRole::Funding => Network::Base,
            WalletRole::Farming => Network::Secondary,
        }
    }
}

impl fmt::Display for WalletRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of an identity table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub private_key: String,
    pub address: String,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub balance: Option<Decimal>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl IdentityRecord {
    pub fn from_key(key: &LocalKey) -> Self {
        Self {
            private_key: key.private_key_hex(),
            address: key.checksum_address(),
            balance: None,
            last_updated: None,
        }
    }

    pub fn to_identity(&self) -> AppResult<Identity> {
        LocalKey::from_hex(&self.private_key).map(Identity::new)
    }
}

/// An identity that can sign transactions
#[derive(Debug, Clone)]
pub struct Identity {
    key: LocalKey,
}

impl Identity {
    pub fn new(key: LocalKey) -> Self {
        Self { key }
    }

    pub fn address(&self) -> Address {
        self.key.address()
    }

    pub fn checksum_address(&self) -> String {
        self.key.checksum_address()
    }

    pub fn key(&self) -> &LocalKey {
        &self.key
    }
}
