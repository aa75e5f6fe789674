use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::error::{AppResult, ExecutionError};
use crate::execution::rpc::{wait_for_receipt, ChainClient};
use crate::execution::tx::{outcome_status, send_transaction, CallRequest};
use crate::execution::units::ether_to_wei;
use crate::ledger::models::{Asset, Network, TransactionRecord};
use crate::ledger::TransactionLedger;
use crate::wallet::Identity;

#[derive(Debug, Clone)]
pub struct NativeTransferConfig {
    pub gas_limit: u64,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for NativeTransferConfig {
    fn default() -> Self {
        Self {
            gas_limit: 1_500_000,
            receipt_timeout: Duration::from_secs(900),
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// Single-network transfer of the native asset
#[async_trait]
pub trait NativeTransfer: Send + Sync {
    fn network(&self) -> Network;

    /// Blocks until the transfer is included; returns its hash
    async fn transfer(
        &self,
        sender: &Identity,
        to: Address,
        asset: Asset,
        amount: Decimal,
        operation_id: Option<i64>,
    ) -> AppResult<B256>;
}

pub struct NativeTransferProvider {
    config: NativeTransferConfig,
    client: Arc<dyn ChainClient>,
    ledger: Arc<dyn TransactionLedger>,
}

impl NativeTransferProvider {
    pub fn new(
        config: NativeTransferConfig,
        client: Arc<dyn ChainClient>,
        ledger: Arc<dyn TransactionLedger>,
    ) -> Self {
        Self {
            config,
            client,
            ledger,
        }
    }
}

#[async_trait]
impl NativeTransfer for NativeTransferProvider {
    fn network(&self) -> Network {
        self.client.network()
    }

    #[instrument(skip(self, sender), fields(from = %sender.checksum_address()))]
    async fn transfer(
        &self,
        sender: &Identity,
        to: Address,
        asset: Asset,
        amount: Decimal,
        operation_id: Option<i64>,
    ) -> AppResult<B256> {
        let network = self.client.network();
        if asset != network.native_asset() {
            return Err(ExecutionError::UnsupportedAsset { network, asset }.into());
        }
        let value = ether_to_wei(amount)?;

        let sent = send_transaction(
            self.client.as_ref(),
            sender.key(),
            CallRequest {
                to,
                value,
                data: Bytes::new(),
                gas_limit: self.config.gas_limit,
            },
        )
        .await?;

        let outcome = wait_for_receipt(
            self.client.as_ref(),
            sent.tx_hash,
            self.config.receipt_timeout,
            self.config.poll_interval,
        )
        .await;

        let record = TransactionRecord::new(
            operation_id,
            network,
            sender.checksum_address(),
            to.to_checksum(None),
            amount,
            format!("{:#x}", sent.tx_hash),
            sent.sent_at,
        )
        .completed(outcome_status(&outcome));
        self.ledger.record_or_warn(&record).await;

        let receipt = outcome?;
        if !receipt.status {
            error!("❌ Transfer {:#x} reverted on {}", sent.tx_hash, network);
            return Err(ExecutionError::TransactionReverted {
                network,
                tx_hash: format!("{:#x}", sent.tx_hash),
            }
            .into());
        }

        info!(
            "✅ Transferred {} {} to {} ({:#x})",
            amount,
            asset,
            to.to_checksum(None),
            sent.tx_hash
        );
        Ok(sent.tx_hash)
    }
}
