use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{length_of_length, BufMut, Encodable, Header};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{AppError, AppResult, ExecutionError};
use crate::execution::rpc::{ChainClient, TxReceipt};
use crate::ledger::models::TxStatus;
use crate::wallet::keys::{LocalKey, RecoverableSignature};

/// Pre-EIP-2718 transaction with EIP-155 replay protection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl LegacyTransaction {
    fn fields_length(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.to.length()
            + self.value.length()
            + self.data.length()
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.data.encode(out);
    }

    /// keccak256 of rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])
    pub fn signing_hash(&self) -> B256 {
        let payload_length = self.fields_length() + self.chain_id.length() + 2;
        let mut out = Vec::with_capacity(payload_length + length_of_length(payload_length));
        Header {
            list: true,
            payload_length,
        }
        .encode(&mut out);
        self.encode_fields(&mut out);
        self.chain_id.encode(&mut out);
        0u8.encode(&mut out);
        0u8.encode(&mut out);
        keccak256(&out)
    }

    /// rlp([nonce, gasPrice, gas, to, value, data, v, r, s])
    pub fn encode_signed(&self, signature: &RecoverableSignature) -> Bytes {
        let v = U256::from(self.chain_id) * U256::from(2u8)
            + U256::from(35u8 + signature.recovery_id);
        let payload_length =
            self.fields_length() + v.length() + signature.r.length() + signature.s.length();

        let mut out = Vec::with_capacity(payload_length + length_of_length(payload_length));
        Header {
            list: true,
            payload_length,
        }
        .encode(&mut out);
        self.encode_fields(&mut out);
        v.encode(&mut out);
        signature.r.encode(&mut out);
        signature.s.encode(&mut out);
        Bytes::from(out)
    }

    pub fn sign(&self, key: &LocalKey) -> AppResult<Bytes> {
        let signature = key.sign_hash(&self.signing_hash())?;
        Ok(self.encode_signed(&signature))
    }
}

/// A call to submit from one identity
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: u64,
}

/// A signed transaction accepted by the node
#[derive(Debug, Clone, Copy)]
pub struct Sent {
    pub tx_hash: B256,
    pub nonce: u64,
    pub sent_at: DateTime<Utc>,
}

/// Build with live gas price and nonce, sign, and submit
pub async fn send_transaction(
    client: &dyn ChainClient,
    key: &LocalKey,
    request: CallRequest,
) -> AppResult<Sent> {
    let chain_id = client.chain_id().await?;
    let gas_price = client.gas_price().await?;
    let nonce = client.transaction_count(key.address()).await?;

    let tx = LegacyTransaction {
        chain_id,
        nonce,
        gas_price,
        gas_limit: request.gas_limit,
        to: request.to,
        value: request.value,
        data: request.data,
    };
    let raw = tx.sign(key)?;

    let sent_at = Utc::now();
    let tx_hash = client.send_raw_transaction(raw).await?;
    info!(
        "📤 Submitted {:#x} on {} (nonce {}, gas price {})",
        tx_hash,
        client.network(),
        nonce,
        gas_price
    );

    Ok(Sent {
        tx_hash,
        nonce,
        sent_at,
    })
}

/// Ledger status for the outcome of a receipt wait
pub fn outcome_status(outcome: &AppResult<TxReceipt>) -> TxStatus {
    match outcome {
        Ok(receipt) if receipt.status => TxStatus::Confirmed,
        Ok(_) => TxStatus::Failed,
        Err(AppError::Execution(ExecutionError::ReceiptTimeout { .. })) => TxStatus::Timeout,
        Err(_) => TxStatus::Failed,
    }
}
