use std::path::PathBuf;
use std::time::Duration;

use crate::ledger::models::{Asset, Network};
use thiserror::Error;

/// Top-level error type for the worker
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Chain provider errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Asset {asset} is not supported on {network}")]
    UnsupportedAsset { network: Network, asset: Asset },

    #[error("Route {from} -> {to} ({asset}) is not supported")]
    UnsupportedRoute {
        from: Network,
        to: Network,
        asset: Asset,
    },

    #[error("Source chain transaction {tx_hash} failed on {network}")]
    SourceChainFailure { network: Network, tx_hash: String },

    #[error("Destination transaction {tx_hash} on {network} not confirmed within {timeout:?} (source {source_hash} confirmed)")]
    DestinationTimeout {
        network: Network,
        source_hash: String,
        tx_hash: String,
        timeout: Duration,
    },

    #[error("Path encoding mismatch: {tokens} tokens require {expected} fees, got {fees}")]
    PathEncodingMismatch {
        tokens: usize,
        fees: usize,
        expected: usize,
    },

    #[error("Transaction {tx_hash} on {network} not confirmed within {timeout:?}")]
    ReceiptTimeout {
        network: Network,
        tx_hash: String,
        timeout: Duration,
    },

    #[error("Transaction {tx_hash} reverted on {network}")]
    TransactionReverted { network: Network, tx_hash: String },

    #[error("Malformed receipt on {network}: {message}")]
    MalformedReceipt { network: Network, message: String },

    #[error("RPC error on {network}: {message}")]
    Rpc { network: Network, message: String },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Persistence failures on the file-backed tables
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Refusing to overwrite {path}: last load failed ({reason})")]
    WriteRefused { path: PathBuf, reason: String },

    #[error("Failed to serialize table for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Operation registry load and validation errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Operation registry {0} is empty")]
    Empty(PathBuf),

    #[error("Operation registry unavailable: {0}")]
    Unavailable(#[from] StoreError),

    #[error("Duplicate operation id {0}")]
    DuplicateId(i64),

    #[error("Operation {id} ({name}): missing field `{field}`")]
    MissingField {
        id: i64,
        name: String,
        field: &'static str,
    },

    #[error("Operation {id} ({name}): invalid field `{field}`: {reason}")]
    InvalidField {
        id: i64,
        name: String,
        field: &'static str,
        reason: String,
    },
}

impl From<rust_decimal::Error> for AppError {
    fn from(error: rust_decimal::Error) -> Self {
        AppError::InvalidInput(format!("Decimal conversion error: {:?}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Internal(format!("HTTP request error: {:?}", error))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Result type alias for the worker
pub type AppResult<T> = Result<T, AppError>;
