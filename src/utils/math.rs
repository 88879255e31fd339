//! Mathematical utility functions

use alloy::primitives::U256;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use crate::errors::{BotError, BotResult};

pub fn pow10(n: u32) -> Decimal {
    match n {
        0 => dec!(1),
        6 => dec!(1_000_000),
        18 => dec!(1_000_000_000_000_000_000),
        _ => (0..n).fold(dec!(1), |acc, _| acc * dec!(10)),
    }
}

/// Quote-currency amount to integer token units, truncating dust below one unit.
pub fn to_token_units(amount: Decimal, decimals: u32) -> BotResult<U256> {
    if amount < Decimal::ZERO {
        return Err(BotError::ExecutionFailed {
            opportunity_id: String::new(),
            reason: format!("negative token amount {amount}"),
        });
    }
    let units = amount
        .checked_mul(pow10(decimals))
        .and_then(|v| v.trunc().to_u128())
        .ok_or_else(|| BotError::ExecutionFailed {
            opportunity_id: String::new(),
            reason: format!("{amount} does not fit in {decimals}-decimal units"),
        })?;
    Ok(U256::from(units))
}

pub fn percent_of(value: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        Decimal::ZERO
    } else {
        value / total * dec!(100)
    }
}
