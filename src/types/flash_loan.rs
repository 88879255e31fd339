//! Flash loan provider metadata, quotes and execution parameters

use alloy::primitives::{Address, Bytes, U256};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use super::Chain;

/// Static description of one configured provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub id: String,
    pub chain: Chain,
    pub fee_bps: Decimal,
    /// 0..=100, higher is better.
    pub reliability: Decimal,
    /// Maximum single borrow in quote currency.
    pub max_capacity_usd: Decimal,
    pub supported_assets: Vec<String>,
    /// Lending pool / vault / flash pool the call is sent to.
    pub pool: Address,
    /// Gas units a full flash-loan round trip is expected to burn.
    pub gas_units: u64,
}

impl ProviderInfo {
    pub fn supports(&self, asset: &str) -> bool {
        self.supported_assets
            .iter()
            .any(|a| a.eq_ignore_ascii_case(asset))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlashLoanQuote {
    pub provider_id: String,
    pub asset: String,
    pub borrow_amount: Decimal,
    pub fee_amount: Decimal,
    pub gas_estimate: u64,
    /// Gas expressed in quote currency.
    pub gas_cost: Decimal,
    pub total_cost: Decimal,
    /// 0..=1
    pub confidence_score: Decimal,
}

impl FlashLoanQuote {
    pub fn new(
        provider_id: impl Into<String>,
        asset: impl Into<String>,
        borrow_amount: Decimal,
        fee_amount: Decimal,
        gas_estimate: u64,
        gas_cost: Decimal,
        confidence_score: Decimal,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            asset: asset.into(),
            borrow_amount,
            fee_amount,
            gas_estimate,
            gas_cost,
            total_cost: fee_amount + gas_cost,
            confidence_score,
        }
    }
}

/// Gas market inputs for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GasSnapshot {
    pub gas_price_gwei: Decimal,
    pub native_token_usd: Decimal,
}

impl GasSnapshot {
    pub fn cost_usd(&self, gas_units: u64) -> Decimal {
        Decimal::from(gas_units) * self.gas_price_gwei * self.native_token_usd / dec!(1_000_000_000)
    }
}

/// Calldata-ready transaction description for one dispatch.
#[derive(Debug, Clone)]
pub struct ExecutionParams {
    pub opportunity_id: String,
    pub provider_id: String,
    pub protocol: &'static str,
    pub chain: Chain,
    pub target: Address,
    pub asset: Address,
    pub borrow_amount: Decimal,
    pub borrow_units: U256,
    pub calldata: Bytes,
    pub gas_limit: u64,
    pub expected_profit: Decimal,
}
