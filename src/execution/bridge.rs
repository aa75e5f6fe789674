use alloy_primitives::{address, keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::error::{AppError, AppResult, ExecutionError};
use crate::execution::abi::{decode_uint, encode_call, Token};
use crate::execution::rpc::{wait_for_receipt, ChainClient, TxReceipt};
use crate::execution::tx::{outcome_status, send_transaction, CallRequest};
use crate::execution::units::ether_to_wei;
use crate::ledger::models::{BridgeRoute, TransactionRecord};
use crate::ledger::TransactionLedger;
use crate::wallet::Identity;

const BASE_COST_SIGNATURE: &str = "l2TransactionBaseCost(uint256,uint256,uint256)";
const REQUEST_L2_SIGNATURE: &str =
    "requestL2Transaction(address,uint256,bytes,uint256,uint256,bytes[],address)";
const PRIORITY_REQUEST_EVENT: &str = "NewPriorityRequest(uint256,bytes32,uint64,(uint256,uint256,uint256,uint256,uint256,uint256,uint256,uint256,uint256,uint256,uint256[4],bytes,bytes,uint256[],bytes,bytes),bytes[])";

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Rollup main contract on the source network
    pub main_contract: Address,
    pub gas_limit: u64,
    pub l2_gas_limit: u64,
    pub gas_per_pubdata: u64,
    pub source_timeout: Duration,
    pub destination_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            main_contract: address!("32400084c286cf3e17e7b677ea9583e60a000324"),
            gas_limit: 1_500_000,
            l2_gas_limit: 300_000,
            gas_per_pubdata: 800,
            source_timeout: Duration::from_secs(900),
            destination_timeout: Duration::from_secs(360),
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// Hashes of both legs of a confirmed bridge transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeReceipt {
    pub source_hash: B256,
    pub destination_hash: B256,
}

/// Two-phase cross-network transfer.
///
/// Success is only returned once both legs confirm. A confirmed source leg
/// with a missing or failed destination leg surfaces as an error.
#[async_trait]
pub trait Bridge: Send + Sync {
    async fn transfer_and_bridge(
        &self,
        sender: &Identity,
        recipient: Address,
        route: BridgeRoute,
        amount: Decimal,
        operation_id: Option<i64>,
    ) -> AppResult<BridgeReceipt>;

    /// Move the sender's own funds across
    async fn bridge(
        &self,
        sender: &Identity,
        route: BridgeRoute,
        amount: Decimal,
        operation_id: Option<i64>,
    ) -> AppResult<BridgeReceipt> {
        self.transfer_and_bridge(sender, sender.address(), route, amount, operation_id)
            .await
    }
}

pub struct BridgeProvider {
    config: BridgeConfig,
    source: Arc<dyn ChainClient>,
    destination: Arc<dyn ChainClient>,
    ledger: Arc<dyn TransactionLedger>,
}

impl BridgeProvider {
    pub fn new(
        config: BridgeConfig,
        source: Arc<dyn ChainClient>,
        destination: Arc<dyn ChainClient>,
        ledger: Arc<dyn TransactionLedger>,
    ) -> Self {
        Self {
            config,
            source,
            destination,
            ledger,
        }
    }

    /// Fee the main contract charges for executing the priority operation
    async fn base_cost(&self) -> AppResult<U256> {
        let gas_price = self.source.gas_price().await?;
        let data = encode_call(
            BASE_COST_SIGNATURE,
            &[
                Token::Uint(gas_price),
                Token::uint(self.config.l2_gas_limit),
                Token::uint(self.config.gas_per_pubdata),
            ],
        );
        let result = self.source.call(self.config.main_contract, data).await?;
        decode_uint(&result).ok_or_else(|| {
            ExecutionError::Rpc {
                network: self.source.network(),
                message: format!("{} returned {} bytes", BASE_COST_SIGNATURE, result.len()),
            }
            .into()
        })
    }

    /// Destination transaction hash announced by the priority request event
    fn destination_hash(&self, receipt: &TxReceipt) -> AppResult<B256> {
        let topic = keccak256(PRIORITY_REQUEST_EVENT.as_bytes());
        receipt
            .logs
            .iter()
            .find(|log| {
                log.address == self.config.main_contract && log.topics.first() == Some(&topic)
            })
            .and_then(|log| log.data.get(32..64))
            .map(B256::from_slice)
            .ok_or_else(|| {
                ExecutionError::MalformedReceipt {
                    network: self.source.network(),
                    message: format!(
                        "no priority request event in {:#x}",
                        receipt.transaction_hash
                    ),
                }
                .into()
            })
    }
}

#[async_trait]
impl Bridge for BridgeProvider {
    #[instrument(skip(self, sender), fields(from = %sender.checksum_address()))]
    async fn transfer_and_bridge(
        &self,
        sender: &Identity,
        recipient: Address,
        route: BridgeRoute,
        amount: Decimal,
        operation_id: Option<i64>,
    ) -> AppResult<BridgeReceipt> {
        if !route.is_supported() || route.from != self.source.network() {
            return Err(ExecutionError::UnsupportedRoute {
                from: route.from,
                to: route.to,
                asset: route.asset,
            }
            .into());
        }
        let amount_wei = ether_to_wei(amount)?;

        // Phase 1: deposit on the source network.
        let base_cost = self.base_cost().await?;
        let data = encode_call(
            REQUEST_L2_SIGNATURE,
            &[
                Token::Address(recipient),
                Token::Uint(amount_wei),
                Token::Bytes(Bytes::new()),
                Token::uint(self.config.l2_gas_limit),
                Token::uint(self.config.gas_per_pubdata),
                Token::Array(Vec::new()),
                Token::Address(sender.address()),
            ],
        );

        let sent = send_transaction(
            self.source.as_ref(),
            sender.key(),
            CallRequest {
                to: self.config.main_contract,
                value: amount_wei + base_cost,
                data,
                gas_limit: self.config.gas_limit,
            },
        )
        .await?;
        let source_hash = format!("{:#x}", sent.tx_hash);

        let outcome = wait_for_receipt(
            self.source.as_ref(),
            sent.tx_hash,
            self.config.source_timeout,
            self.config.poll_interval,
        )
        .await;
        let source_record = TransactionRecord::new(
            operation_id,
            route.from,
            sender.checksum_address(),
            self.config.main_contract.to_checksum(None),
            amount,
            source_hash.clone(),
            sent.sent_at,
        )
        .completed(outcome_status(&outcome))
        .with_details(serde_json::json!({
            "leg": "source",
            "recipient": recipient.to_checksum(None),
            "base_cost_wei": base_cost.to_string(),
        }));
        self.ledger.record_or_warn(&source_record).await;

        let source_receipt = outcome?;
        if !source_receipt.status {
            error!("❌ Deposit {} failed on {}", source_hash, route.from);
            return Err(ExecutionError::SourceChainFailure {
                network: route.from,
                tx_hash: source_hash,
            }
            .into());
        }
        info!("✅ Deposit {} confirmed on {}", source_hash, route.from);

        // Phase 2: wait for the derived transaction on the destination network.
        let destination_hash = self.destination_hash(&source_receipt)?;
        let dest_hash_str = format!("{:#x}", destination_hash);
        let dest_sent_at = chrono::Utc::now();

        let outcome = wait_for_receipt(
            self.destination.as_ref(),
            destination_hash,
            self.config.destination_timeout,
            self.config.poll_interval,
        )
        .await;
        let dest_record = TransactionRecord::new(
            operation_id,
            route.to,
            sender.checksum_address(),
            recipient.to_checksum(None),
            amount,
            dest_hash_str.clone(),
            dest_sent_at,
        )
        .completed(outcome_status(&outcome))
        .with_details(serde_json::json!({
            "leg": "destination",
            "source_hash": source_hash,
        }));
        self.ledger.record_or_warn(&dest_record).await;

        let dest_receipt = match outcome {
            Ok(receipt) => receipt,
            Err(AppError::Execution(ExecutionError::ReceiptTimeout { timeout, .. })) => {
                warn!(
                    "⏳ Deposit {} confirmed but {} not final on {} after {:?}",
                    source_hash, dest_hash_str, route.to, timeout
                );
                return Err(ExecutionError::DestinationTimeout {
                    network: route.to,
                    source_hash,
                    tx_hash: dest_hash_str,
                    timeout,
                }
                .into());
            }
            Err(e) => return Err(e),
        };

        if !dest_receipt.status {
            error!("❌ Destination {} failed on {}", dest_hash_str, route.to);
            return Err(ExecutionError::TransactionReverted {
                network: route.to,
                tx_hash: dest_hash_str,
            }
            .into());
        }

        info!(
            "🌉 Bridged {} {} to {} ({} -> {})",
            amount,
            route.asset,
            recipient.to_checksum(None),
            source_hash,
            dest_hash_str
        );
        Ok(BridgeReceipt {
            source_hash: sent.tx_hash,
            destination_hash,
        })
    }
}
