//! In-memory `ChainClient` used by provider and workflow tests.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rust_decimal::Decimal;

use crate::adapters::traits::{SwapProvider, SwapResult, SwapRoute};
use crate::error::{AppError, AppResult, ExecutionError};
use crate::execution::bridge::{Bridge, BridgeReceipt};
use crate::execution::native::NativeTransfer;
use crate::execution::rpc::{ChainClient, ReceiptLog, TxReceipt};
use crate::ledger::models::{Asset, BridgeRoute, Network, TransactionRecord, TxStatus};
use crate::ledger::TransactionLedger;
use crate::wallet::Identity;

pub struct MockChainClient {
    network: Network,
    pub chain_id: u64,
    pub balance: Mutex<U256>,
    pub call_responses: Mutex<VecDeque<Bytes>>,
    pub receipt_status: AtomicBool,
    pub receipt_logs: Mutex<Vec<ReceiptLog>>,
    pub withhold_receipts: AtomicBool,
    pub sent: Mutex<Vec<Bytes>>,
    pub call_data: Mutex<Vec<(Address, Bytes)>>,
    calls: AtomicUsize,
}

impl MockChainClient {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            chain_id: 1,
            balance: Mutex::new(U256::ZERO),
            call_responses: Mutex::new(VecDeque::new()),
            receipt_status: AtomicBool::new(true),
            receipt_logs: Mutex::new(Vec::new()),
            withhold_receipts: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            call_data: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Total number of trait method invocations
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn network(&self) -> Network {
        self.network
    }

    async fn chain_id(&self) -> AppResult<u64> {
        self.tick();
        Ok(self.chain_id)
    }

    async fn gas_price(&self) -> AppResult<U256> {
        self.tick();
        Ok(U256::from(1_000_000_000u64))
    }

    async fn transaction_count(&self, _address: Address) -> AppResult<u64> {
        self.tick();
        Ok(self.sent.lock().len() as u64)
    }

    async fn balance(&self, _address: Address) -> AppResult<U256> {
        self.tick();
        Ok(*self.balance.lock())
    }

    async fn call(&self, to: Address, data: Bytes) -> AppResult<Bytes> {
        self.tick();
        self.call_data.lock().push((to, data));
        Ok(self
            .call_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Bytes::from(vec![0u8; 32])))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> AppResult<B256> {
        self.tick();
        let hash = keccak256(&raw);
        self.sent.lock().push(raw);
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: B256) -> AppResult<Option<TxReceipt>> {
        self.tick();
        if self.withhold_receipts.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            transaction_hash: hash,
            status: self.receipt_status.load(Ordering::SeqCst),
            block_number: Some(1),
            logs: self.receipt_logs.lock().clone(),
        }))
    }
}

/// Ledger that keeps records in memory, or fails every write
#[derive(Default)]
pub struct MemoryLedger {
    pub records: Mutex<Vec<TransactionRecord>>,
    pub fail_writes: bool,
}

impl MemoryLedger {
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }
}

#[async_trait]
impl TransactionLedger for MemoryLedger {
    async fn record(&self, record: &TransactionRecord) -> AppResult<()> {
        if self.fail_writes {
            return Err(AppError::Internal("ledger unavailable".to_string()));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Bridge that records each request and optionally fails it
#[derive(Default)]
pub struct MockBridge {
    pub requests: Mutex<Vec<(Address, Address, BridgeRoute, Decimal)>>,
    pub fail: bool,
}

#[async_trait]
impl Bridge for MockBridge {
    async fn transfer_and_bridge(
        &self,
        sender: &Identity,
        recipient: Address,
        route: BridgeRoute,
        amount: Decimal,
        _operation_id: Option<i64>,
    ) -> AppResult<BridgeReceipt> {
        self.requests
            .lock()
            .push((sender.address(), recipient, route, amount));
        if self.fail {
            return Err(ExecutionError::DestinationTimeout {
                network: route.to,
                source_hash: format!("{:#x}", B256::ZERO),
                tx_hash: format!("{:#x}", B256::ZERO),
                timeout: std::time::Duration::from_secs(360),
            }
            .into());
        }
        Ok(BridgeReceipt {
            source_hash: B256::repeat_byte(1),
            destination_hash: B256::repeat_byte(2),
        })
    }
}

/// Swap provider that records each request
#[derive(Default)]
pub struct MockSwap {
    pub requests: Mutex<Vec<(Address, SwapRoute, Decimal)>>,
}

#[async_trait]
impl SwapProvider for MockSwap {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn network(&self) -> Network {
        Network::Secondary
    }

    async fn swap(
        &self,
        sender: &Identity,
        route: &SwapRoute,
        amount: Decimal,
        _operation_id: Option<i64>,
    ) -> AppResult<SwapResult> {
        self.requests
            .lock()
            .push((sender.address(), route.clone(), amount));
        Ok(SwapResult {
            transaction_hash: B256::repeat_byte(3),
            amount_in: amount,
            status: TxStatus::Confirmed,
        })
    }
}

/// Native transfer provider that records each request
#[derive(Default)]
pub struct MockTransfer {
    pub requests: Mutex<Vec<(Address, Address, Asset, Decimal)>>,
}

#[async_trait]
impl NativeTransfer for MockTransfer {
    fn network(&self) -> Network {
        Network::Base
    }

    async fn transfer(
        &self,
        sender: &Identity,
        to: Address,
        asset: Asset,
        amount: Decimal,
        _operation_id: Option<i64>,
    ) -> AppResult<B256> {
        self.requests
            .lock()
            .push((sender.address(), to, asset, amount));
        Ok(B256::repeat_byte(4))
    }
}
