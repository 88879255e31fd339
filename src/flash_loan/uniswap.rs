//! Uniswap V3 pool `flash`
//!
//! The pool lends either of its two tokens; the fee is the pool's fee tier.

use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use crate::{
    errors::{BotError, BotResult},
    flash_loan::provider::{metadata_quote, FlashLoanProvider, FlashLoanRequest},
    types::{FlashLoanQuote, GasSnapshot, ProviderInfo},
};

sol! {
    interface IUniswapV3Pool {
        function flash(address recipient, uint256 amount0, uint256 amount1, bytes data) external;
    }
}

pub struct UniswapV3FlashProvider {
    info: ProviderInfo,
    token0: Address,
    token1: Address,
}

impl UniswapV3FlashProvider {
    pub fn new(info: ProviderInfo, token0: Address, token1: Address) -> Self {
        Self { info, token0, token1 }
    }
}

#[async_trait]
impl FlashLoanProvider for UniswapV3FlashProvider {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    fn protocol_name(&self) -> &'static str {
        "uniswap-v3"
    }

    async fn quote(&self, asset: &str, amount: Decimal, gas: &GasSnapshot) -> BotResult<FlashLoanQuote> {
        metadata_quote(&self.info, self.info.fee_bps, asset, amount, gas)
    }

    fn build_calldata(&self, request: &FlashLoanRequest) -> BotResult<Bytes> {
        let (amount0, amount1) = if request.asset.address == self.token0 {
            (request.amount, U256::ZERO)
        } else if request.asset.address == self.token1 {
            (U256::ZERO, request.amount)
        } else {
            return Err(BotError::ProviderUnhealthy {
                provider_id: self.info.id.clone(),
                reason: format!("pool does not hold {}", request.asset.symbol),
            });
        };

        let call = IUniswapV3Pool::flashCall {
            recipient: request.receiver,
            amount0,
            amount1,
            data: request.user_data.clone(),
        };
        Ok(Bytes::from(call.abi_encode()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{asset_info, Chain, UNISWAP_V3_USDC_WETH_ETHEREUM};
    use rust_decimal_macros::dec;

    fn provider() -> UniswapV3FlashProvider {
        let usdc = asset_info(Chain::Ethereum, "USDC").unwrap();
        let weth = asset_info(Chain::Ethereum, "WETH").unwrap();
        UniswapV3FlashProvider::new(
            ProviderInfo {
                id: "uniswap-v3".into(),
                chain: Chain::Ethereum,
                fee_bps: dec!(5),
                reliability: dec!(92),
                max_capacity_usd: dec!(1_000_000),
                supported_assets: vec!["USDC".into(), "WETH".into()],
                pool: UNISWAP_V3_USDC_WETH_ETHEREUM,
                gas_units: 360_000,
            },
            usdc.address,
            weth.address,
        )
    }

    #[test]
    fn test_borrowed_side_follows_token_order() {
        let weth = asset_info(Chain::Ethereum, "WETH").unwrap();
        let calldata = provider()
            .build_calldata(&FlashLoanRequest {
                receiver: Address::repeat_byte(0x33),
                asset: weth,
                amount: U256::from(7u64),
                user_data: Bytes::new(),
            })
            .unwrap();
        let decoded = IUniswapV3Pool::flashCall::abi_decode(&calldata, true).unwrap();
        assert_eq!(decoded.amount0, U256::ZERO);
        assert_eq!(decoded.amount1, U256::from(7u64));
    }

    #[test]
    fn test_foreign_asset_rejected() {
        let dai = asset_info(Chain::Ethereum, "DAI").unwrap();
        let result = provider().build_calldata(&FlashLoanRequest {
            receiver: Address::ZERO,
            asset: dai,
            amount: U256::from(1u64),
            user_data: Bytes::new(),
        });
        assert!(result.is_err());
    }
}
