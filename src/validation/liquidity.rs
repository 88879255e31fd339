//! Liquidity validation functions

use anyhow::Result;
use rust_decimal::prelude::*;

pub fn validate_liquidity(liquidity_usd: Decimal, min_liquidity_usd: Decimal) -> Result<()> {
    if liquidity_usd < min_liquidity_usd {
        return Err(anyhow::anyhow!(
            "Insufficient liquidity: ${} (min ${})",
            liquidity_usd.round_dp(2),
            min_liquidity_usd
        ));
    }
    Ok(())
}
