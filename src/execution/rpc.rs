use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::error::{AppError, AppResult, ExecutionError};
use crate::ledger::models::Network;

/// Event log emitted by a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReceiptLog {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
}

/// The subset of a transaction receipt the providers act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub status: bool,
    pub block_number: Option<u64>,
    pub logs: Vec<ReceiptLog>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: B256,
    status: Option<String>,
    block_number: Option<String>,
    #[serde(default)]
    logs: Vec<ReceiptLog>,
}

impl RawReceipt {
    fn into_receipt(self, network: Network) -> AppResult<TxReceipt> {
        let status = match self.status.as_deref() {
            Some(raw) => parse_quantity(raw, network)? == U256::from(1u8),
            // Pre-byzantium receipts carry no status; treat inclusion as success.
            None => true,
        };
        let block_number = match self.block_number.as_deref() {
            Some(raw) => Some(parse_quantity(raw, network)?.saturating_to::<u64>()),
            None => None,
        };

        Ok(TxReceipt {
            transaction_hash: self.transaction_hash,
            status,
            block_number,
            logs: self.logs,
        })
    }
}

/// JSON-RPC access to one EVM-compatible network.
///
/// Every call is a network round trip; there is no subscription support.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn network(&self) -> Network;

    async fn chain_id(&self) -> AppResult<u64>;

    async fn gas_price(&self) -> AppResult<U256>;

    async fn transaction_count(&self, address: Address) -> AppResult<u64>;

    async fn balance(&self, address: Address) -> AppResult<U256>;

    /// Read-only contract call against the latest block
    async fn call(&self, to: Address, data: Bytes) -> AppResult<Bytes>;

    async fn send_raw_transaction(&self, raw: Bytes) -> AppResult<B256>;

    async fn transaction_receipt(&self, hash: B256) -> AppResult<Option<TxReceipt>>;
}

/// Poll for a receipt until it appears or `timeout` elapses.
///
/// A poll that is still in flight when the deadline passes is abandoned.
pub async fn wait_for_receipt(
    client: &dyn ChainClient,
    hash: B256,
    timeout: Duration,
    poll_interval: Duration,
) -> AppResult<TxReceipt> {
    let deadline = tokio::time::Instant::now() + timeout;
    let timed_out = || -> AppError {
        ExecutionError::ReceiptTimeout {
            network: client.network(),
            tx_hash: format!("{hash:#x}"),
            timeout,
        }
        .into()
    };

    loop {
        match tokio::time::timeout_at(deadline, client.transaction_receipt(hash)).await {
            Ok(Ok(Some(receipt))) => {
                debug!(
                    "Receipt for {:#x} on {} in block {:?}",
                    hash,
                    client.network(),
                    receipt.block_number
                );
                return Ok(receipt);
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(timed_out()),
        }

        let now = tokio::time::Instant::now();
        if now >= deadline {
            return Err(timed_out());
        }

        debug!("Receipt for {:#x} on {} not available yet", hash, client.network());
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}

/// Parse a `0x`-prefixed hex quantity
pub fn parse_quantity(raw: &str, network: Network) -> AppResult<U256> {
    let digits = raw.trim().trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|e| {
        ExecutionError::Rpc {
            network,
            message: format!("Invalid quantity {}: {}", raw, e),
        }
        .into()
    })
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

/// reqwest-backed JSON-RPC client
pub struct HttpChainClient {
    network: Network,
    rpc_url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpChainClient {
    /// `request_timeout` bounds every request, connect included
    pub fn new(
        network: Network,
        rpc_url: impl Into<String>,
        request_timeout: Duration,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            network,
            rpc_url: rpc_url.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    fn rpc_error(&self, message: impl Into<String>) -> ExecutionError {
        ExecutionError::Rpc {
            network: self.network,
            message: message.into(),
        }
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> AppResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.rpc_error(format!("{} request failed: {}", method, e)))?
            .error_for_status()
            .map_err(|e| self.rpc_error(format!("{} returned {}", method, e)))?
            .json()
            .await
            .map_err(|e| self.rpc_error(format!("{} response unreadable: {}", method, e)))?;

        if let Some(error) = response.error {
            return Err(self
                .rpc_error(format!("{} failed ({}): {}", method, error.code, error.message))
                .into());
        }

        serde_json::from_value(response.result.unwrap_or(Value::Null))
            .map_err(|e| self.rpc_error(format!("{} result malformed: {}", method, e)).into())
    }

    async fn quantity(&self, method: &str, params: Value) -> AppResult<U256> {
        let raw: String = self.request(method, params).await?;
        parse_quantity(&raw, self.network)
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    fn network(&self) -> Network {
        self.network
    }

    async fn chain_id(&self) -> AppResult<u64> {
        Ok(self.quantity("eth_chainId", json!([])).await?.saturating_to())
    }

    async fn gas_price(&self) -> AppResult<U256> {
        self.quantity("eth_gasPrice", json!([])).await
    }

    async fn transaction_count(&self, address: Address) -> AppResult<u64> {
        Ok(self
            .quantity("eth_getTransactionCount", json!([address, "pending"]))
            .await?
            .saturating_to())
    }

    async fn balance(&self, address: Address) -> AppResult<U256> {
        self.quantity("eth_getBalance", json!([address, "latest"])).await
    }

    async fn call(&self, to: Address, data: Bytes) -> AppResult<Bytes> {
        self.request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> AppResult<B256> {
        self.request("eth_sendRawTransaction", json!([raw])).await
    }

    async fn transaction_receipt(&self, hash: B256) -> AppResult<Option<TxReceipt>> {
        let raw: Option<RawReceipt> = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        raw.map(|r| r.into_receipt(self.network)).transpose()
    }
}
