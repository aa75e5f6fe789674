use alloy_primitives::{address, Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::adapters::traits::{SwapProvider, SwapResult, SwapRoute};
use crate::error::{AppResult, ExecutionError};
use crate::execution::abi::{encode_call, Token};
use crate::execution::rpc::{wait_for_receipt, ChainClient};
use crate::execution::tx::{outcome_status, send_transaction, CallRequest};
use crate::execution::units::ether_to_wei;
use crate::ledger::models::{Network, TransactionRecord, TxStatus};
use crate::ledger::TransactionLedger;
use crate::wallet::Identity;

const SWAP_AMOUNT_SIGNATURE: &str = "swapAmount((bytes,address,uint128,uint256,uint256))";
const REFUND_ETH_SIGNATURE: &str = "refundETH()";
const MULTICALL_SIGNATURE: &str = "multicall(bytes[])";

#[derive(Debug, Clone)]
pub struct SwapConfig {
    pub swap_contract: Address,
    pub gas_limit: u64,
    /// Added to the submit time to form the on-chain deadline
    pub deadline: Duration,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            swap_contract: address!("943ac2310d9bc703d6ab5e5e76876e212100f894"),
            gas_limit: 1_500_000,
            deadline: Duration::from_secs(10_000),
            receipt_timeout: Duration::from_secs(5_000),
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// iZUMi router on the secondary network: native asset in, any path out
pub struct IzumiSwapProvider {
    config: SwapConfig,
    client: Arc<dyn ChainClient>,
    ledger: Arc<dyn TransactionLedger>,
}

impl IzumiSwapProvider {
    pub fn new(
        config: SwapConfig,
        client: Arc<dyn ChainClient>,
        ledger: Arc<dyn TransactionLedger>,
    ) -> Self {
        Self {
            config,
            client,
            ledger,
        }
    }

    /// multicall([swapAmount(path, recipient, amount, 0, deadline), refundETH()])
    fn build_calldata(
        &self,
        route: &SwapRoute,
        recipient: Address,
        amount_wei: U256,
        deadline: u64,
    ) -> AppResult<alloy_primitives::Bytes> {
        let path = route.encode_path()?;
        let swap = encode_call(
            SWAP_AMOUNT_SIGNATURE,
            &[Token::Tuple(vec![
                Token::Bytes(path),
                Token::Address(recipient),
                Token::Uint(amount_wei),
                Token::uint(0),
                Token::uint(deadline),
            ])],
        );
        let refund = encode_call(REFUND_ETH_SIGNATURE, &[]);

        Ok(encode_call(
            MULTICALL_SIGNATURE,
            &[Token::Array(vec![Token::Bytes(swap), Token::Bytes(refund)])],
        ))
    }
}

#[async_trait]
impl SwapProvider for IzumiSwapProvider {
    fn name(&self) -> &'static str {
        "izumi"
    }

    fn network(&self) -> Network {
        self.client.network()
    }

    #[instrument(skip(self, sender, route), fields(dex = "izumi", from = %sender.checksum_address()))]
    async fn swap(
        &self,
        sender: &Identity,
        route: &SwapRoute,
        amount: Decimal,
        operation_id: Option<i64>,
    ) -> AppResult<SwapResult> {
        let amount_wei = ether_to_wei(amount)?;
        let deadline = Utc::now().timestamp().max(0) as u64 + self.config.deadline.as_secs();
        let data = self.build_calldata(route, sender.address(), amount_wei, deadline)?;

        info!(
            "🔄 Swapping {} {} on {} for {}",
            amount,
            self.network().native_asset(),
            self.name(),
            sender.checksum_address()
        );

        let sent = send_transaction(
            self.client.as_ref(),
            sender.key(),
            CallRequest {
                to: self.config.swap_contract,
                value: amount_wei,
                data,
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
        let status = outcome_status(&outcome);
        let record = TransactionRecord::new(
            operation_id,
            self.network(),
            sender.checksum_address(),
            self.config.swap_contract.to_checksum(None),
            amount,
            format!("{:#x}", sent.tx_hash),
            sent.sent_at,
        )
        .completed(status)
        .with_details(serde_json::json!({ "dex": self.name(), "route": route }));
        self.ledger.record_or_warn(&record).await;

        let receipt = outcome?;
        if !receipt.status {
            error!("❌ Swap {:#x} reverted", sent.tx_hash);
            return Err(ExecutionError::TransactionReverted {
                network: self.network(),
                tx_hash: format!("{:#x}", sent.tx_hash),
            }
            .into());
        }

        info!("✅ Swap {:#x} confirmed", sent.tx_hash);
        Ok(SwapResult {
            transaction_hash: sent.tx_hash,
            amount_in: amount,
            status: TxStatus::Confirmed,
        })
    }
}
