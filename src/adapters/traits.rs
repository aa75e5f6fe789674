use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, ExecutionError};
use crate::ledger::models::{Network, TxStatus};
use crate::wallet::Identity;

/// Width of one fee tier inside an encoded path
pub const FEE_WIDTH: usize = 3;

/// Hop tokens and the fee tier of each pool between them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRoute {
    pub token_chain: Vec<Address>,
    pub fee_chain: Vec<u32>,
}

impl SwapRoute {
    pub fn new(token_chain: Vec<Address>, fee_chain: Vec<u32>) -> Self {
        Self {
            token_chain,
            fee_chain,
        }
    }

    /// `token0 || fee0 || token1 || fee1 || ... || tokenN`, fees as 3-byte big-endian.
    ///
    /// Requires exactly one fee per hop; an empty token chain has no valid fee count.
    pub fn encode_path(&self) -> AppResult<Bytes> {
        let tokens = self.token_chain.len();
        let fees = self.fee_chain.len();
        let expected = tokens.saturating_sub(1);
        if tokens == 0 || fees != expected {
            return Err(ExecutionError::PathEncodingMismatch {
                tokens,
                fees,
                expected,
            }
            .into());
        }

        let mut path = Vec::with_capacity(tokens * 20 + fees * FEE_WIDTH);
        for (i, token) in self.token_chain.iter().enumerate() {
            path.extend_from_slice(token.as_slice());
            if let Some(fee) = self.fee_chain.get(i) {
                if *fee >= 1 << (FEE_WIDTH * 8) {
                    return Err(ExecutionError::InvalidAmount(format!(
                        "fee tier {} does not fit in {} bytes",
                        fee, FEE_WIDTH
                    ))
                    .into());
                }
                path.extend_from_slice(&fee.to_be_bytes()[4 - FEE_WIDTH..]);
            }
        }
        Ok(Bytes::from(path))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResult {
    pub transaction_hash: B256,
    pub amount_in: Decimal,
    pub status: TxStatus,
}

/// A DEX that swaps the native asset along an encoded path
#[async_trait]
pub trait SwapProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn network(&self) -> Network;

    /// Blocks until the swap transaction has a receipt
    async fn swap(
        &self,
        sender: &Identity,
        route: &SwapRoute,
        amount: Decimal,
        operation_id: Option<i64>,
    ) -> AppResult<SwapResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_path_encoding_is_byte_exact() {
        let route = SwapRoute::new(
            vec![
                Address::repeat_byte(0xaa),
                Address::repeat_byte(0xbb),
                Address::repeat_byte(0xcc),
            ],
            vec![500, 3000],
        );

        let path = route.encode_path().unwrap();

        let expected = format!(
            "{}{}{}{}{}",
            "aa".repeat(20),
            "0001f4",
            "bb".repeat(20),
            "000bb8",
            "cc".repeat(20)
        );
        assert_eq!(hex::encode(&path), expected);
        assert_eq!(path.len(), 66);
    }

    #[test]
    fn test_fee_count_must_match_hops() {
        let route = SwapRoute::new(
            vec![Address::repeat_byte(1), Address::repeat_byte(2)],
            vec![500, 3000],
        );
        assert!(matches!(
            route.encode_path(),
            Err(AppError::Execution(ExecutionError::PathEncodingMismatch {
                tokens: 2,
                fees: 2,
                expected: 1
            }))
        ));

        let single = SwapRoute::new(vec![Address::repeat_byte(1)], vec![]);
        assert_eq!(
            single.encode_path().unwrap().as_ref(),
            Address::repeat_byte(1).as_slice()
        );
        let single_with_fee = SwapRoute::new(vec![Address::repeat_byte(1)], vec![500]);
        assert!(single_with_fee.encode_path().is_err());

        let empty = SwapRoute::new(vec![], vec![]);
        assert!(empty.encode_path().is_err());
    }

    #[test]
    fn test_oversized_fee_rejected() {
        let route = SwapRoute::new(
            vec![Address::repeat_byte(1), Address::repeat_byte(2)],
            vec![1 << 24],
        );
        assert!(route.encode_path().is_err());
    }
}
