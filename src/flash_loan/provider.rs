//! Flash loan provider abstraction
//!
//! The registry only ever talks to `dyn FlashLoanProvider`. Each protocol knows
//! how to price a loan and how to encode its own entry point; nothing outside
//! this module branches on the protocol.

use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolValue,
};
use async_trait::async_trait;
use rust_decimal::prelude::*;
use crate::{
    errors::{BotError, BotResult},
    types::{asset_info, ArbitrageOpportunity, AssetInfo, FlashLoanQuote, GasSnapshot, ProviderInfo},
    utils::to_token_units,
};

sol! {
    /// Payload handed to the receiver contract's callback.
    struct ArbitrageRoute {
        address asset;
        address token;
        uint64 buyChainId;
        uint64 sellChainId;
        string buyVenue;
        string sellVenue;
        uint256 amount;
        uint256 minProfit;
        uint64 deadline;
    }
}

/// Everything a protocol needs to encode its flash loan entry point.
#[derive(Debug, Clone)]
pub struct FlashLoanRequest {
    pub receiver: Address,
    pub asset: AssetInfo,
    pub amount: U256,
    pub user_data: Bytes,
}

impl FlashLoanRequest {
    pub fn for_opportunity(
        receiver: Address,
        asset: AssetInfo,
        opportunity: &ArbitrageOpportunity,
        borrow_amount: Decimal,
        min_profit: Decimal,
    ) -> BotResult<Self> {
        let amount = to_token_units(borrow_amount, asset.decimals)?;
        let route = ArbitrageRoute {
            asset: asset.address,
            token: traded_token(opportunity)?,
            buyChainId: opportunity.buy_chain.chain_id(),
            sellChainId: opportunity.sell_chain.chain_id(),
            buyVenue: opportunity.buy_venue.clone(),
            sellVenue: opportunity.sell_venue.clone(),
            amount,
            minProfit: to_token_units(min_profit.max(Decimal::ZERO), asset.decimals)?,
            deadline: opportunity.expires_at.timestamp().max(0) as u64,
        };

        Ok(Self {
            receiver,
            asset,
            amount,
            user_data: Bytes::from(route.abi_encode()),
        })
    }
}

/// Address of the arbitraged token: the token id itself, or a known symbol on the buy chain.
pub fn traded_token(opportunity: &ArbitrageOpportunity) -> BotResult<Address> {
    let base = opportunity.token_pair.base.trim();
    if let Ok(address) = base.parse::<Address>() {
        return Ok(address);
    }
    asset_info(opportunity.buy_chain, base)
        .map(|a| a.address)
        .ok_or_else(|| BotError::ExecutionFailed {
            opportunity_id: opportunity.id.clone(),
            reason: format!("token {base} has no address on {}", opportunity.buy_chain),
        })
}

#[async_trait]
pub trait FlashLoanProvider: Send + Sync {
    fn info(&self) -> &ProviderInfo;

    fn protocol_name(&self) -> &'static str;

    fn id(&self) -> &str {
        &self.info().id
    }

    async fn quote(&self, asset: &str, amount: Decimal, gas: &GasSnapshot) -> BotResult<FlashLoanQuote>;

    /// ABI-encoded call to the provider's flash loan entry point.
    fn build_calldata(&self, request: &FlashLoanRequest) -> BotResult<Bytes>;
}

/// Quote from configured metadata: fee from `fee_bps`, gas from the tick's gas price.
pub fn metadata_quote(
    info: &ProviderInfo,
    fee_bps: Decimal,
    asset: &str,
    amount: Decimal,
    gas: &GasSnapshot,
) -> BotResult<FlashLoanQuote> {
    if !info.supports(asset) {
        return Err(BotError::ProviderUnhealthy {
            provider_id: info.id.clone(),
            reason: format!("asset {asset} not supported"),
        });
    }
    if amount > info.max_capacity_usd {
        return Err(BotError::ProviderUnhealthy {
            provider_id: info.id.clone(),
            reason: format!("amount {amount} above capacity {}", info.max_capacity_usd),
        });
    }

    let fee = amount * fee_bps / Decimal::from(10_000);
    Ok(FlashLoanQuote::new(
        info.id.clone(),
        asset,
        amount,
        fee,
        info.gas_units,
        gas.cost_usd(info.gas_units),
        (info.reliability / Decimal::from(100)).min(Decimal::ONE),
    ))
}
