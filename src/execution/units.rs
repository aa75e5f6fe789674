use alloy_primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{AppResult, ExecutionError};

/// Decimal places of the native asset on both networks
pub const ETHER_DECIMALS: u32 = 18;

const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// Convert an ether amount into wei, truncating sub-wei precision
pub fn ether_to_wei(amount: Decimal) -> AppResult<U256> {
    if amount.is_sign_negative() {
        return Err(ExecutionError::InvalidAmount(format!("{} is negative", amount)).into());
    }

    let wei = amount
        .checked_mul(Decimal::from(WEI_PER_ETHER))
        .and_then(|scaled| scaled.trunc().to_u128())
        .ok_or_else(|| ExecutionError::InvalidAmount(format!("{} overflows wei", amount)))?;

    Ok(U256::from(wei))
}

/// Convert a wei quantity into an ether decimal
pub fn wei_to_ether(wei: U256) -> AppResult<Decimal> {
    let raw: i128 = wei
        .try_into()
        .map_err(|_| ExecutionError::InvalidAmount(format!("{} wei overflows a decimal", wei)))?;
    let ether = Decimal::try_from_i128_with_scale(raw, ETHER_DECIMALS)?;
    Ok(ether.normalize())
}
