use async_trait::async_trait;
use sqlx::types::BigDecimal;
use sqlx::PgPool;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use super::models::*;
use crate::error::{AppError, AppResult, StoreError};

/// Append-only audit trail of submitted transactions.
///
/// Providers only ever write to it; nothing in the worker reads it back.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    async fn record(&self, record: &TransactionRecord) -> AppResult<()>;

    /// Audit writes never abort a workflow
    async fn record_or_warn(&self, record: &TransactionRecord) {
        if let Err(e) = self.record(record).await {
            warn!("⚠️ Failed to record tx {} in ledger: {}", record.tx_hash, e);
        }
    }
}

/// Postgres-backed ledger, used when a database url is configured
pub struct PgTransactionLedger {
    pub pool: PgPool,
}

impl PgTransactionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionLedger for PgTransactionLedger {
    async fn record(&self, record: &TransactionRecord) -> AppResult<()> {
        let amount = BigDecimal::from_str(&record.amount.to_string())
            .map_err(|e| AppError::InvalidInput(format!("Invalid ledger amount: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, operation_id, network, from_address, to_address, sent_at, completed_at,
                 amount, tx_hash, status, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(record.operation_id)
        .bind(record.network.as_str())
        .bind(&record.from_address)
        .bind(&record.to_address)
        .bind(record.sent_at)
        .bind(record.completed_at)
        .bind(amount)
        .bind(&record.tx_hash)
        .bind(record.status.as_str())
        .bind(&record.details)
        .execute(&self.pool)
        .await?;

        debug!("Ledger row {} written for tx {}", record.id, record.tx_hash);
        Ok(())
    }
}

/// JSON-lines ledger on local disk. One line per record, never rewritten.
pub struct FileTransactionLedger {
    path: PathBuf,
    lock: parking_lot::Mutex<()>,
}

impl FileTransactionLedger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: parking_lot::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        writeln!(file, "{}", line).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[async_trait]
impl TransactionLedger for FileTransactionLedger {
    async fn record(&self, record: &TransactionRecord) -> AppResult<()> {
        let line = serde_json::to_string(record).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        self.append(&line)?;
        debug!("Ledger line written for tx {}", record.tx_hash);
        Ok(())
    }
}
