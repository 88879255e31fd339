//! Aave V3 `flashLoanSimple`

use alloy::{
    primitives::Bytes,
    providers::Provider,
    rpc::types::eth::TransactionRequest,
    sol,
    sol_types::SolCall,
};
use async_trait::async_trait;
use rust_decimal::prelude::*;
use std::sync::Arc;
use tracing::debug;
use crate::{
    errors::{BotError, BotResult},
    flash_loan::provider::{metadata_quote, FlashLoanProvider, FlashLoanRequest},
    types::{FlashLoanQuote, GasSnapshot, ProviderInfo},
    ConcreteProvider,
};

sol! {
    interface IAaveV3Pool {
        function flashLoanSimple(address receiverAddress, address asset, uint256 amount, bytes calldata params, uint16 referralCode) external;
        function FLASHLOAN_PREMIUM_TOTAL() external view returns (uint128);
    }
}

pub struct AaveV3Provider {
    info: ProviderInfo,
    rpc: Option<Arc<ConcreteProvider>>,
}

impl AaveV3Provider {
    pub fn new(info: ProviderInfo, rpc: Option<Arc<ConcreteProvider>>) -> Self {
        Self { info, rpc }
    }

    /// Live premium in basis points, read from the pool.
    async fn premium_bps(&self, rpc: &ConcreteProvider) -> BotResult<Decimal> {
        let call = IAaveV3Pool::FLASHLOAN_PREMIUM_TOTALCall {};
        let tx = TransactionRequest::default()
            .to(self.info.pool)
            .input(Bytes::from(call.abi_encode()).into());

        let raw = rpc.call(&tx).await.map_err(|e| BotError::Rpc {
            message: format!("FLASHLOAN_PREMIUM_TOTAL on {}", self.info.id),
            source: e.into(),
        })?;
        let premium = IAaveV3Pool::FLASHLOAN_PREMIUM_TOTALCall::abi_decode_returns(&raw, true)
            .map_err(|e| BotError::Rpc {
                message: "undecodable premium".to_string(),
                source: e.into(),
            })?
            ._0;

        Ok(Decimal::from(premium as u64))
    }
}

#[async_trait]
impl FlashLoanProvider for AaveV3Provider {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    fn protocol_name(&self) -> &'static str {
        "aave-v3"
    }

    async fn quote(&self, asset: &str, amount: Decimal, gas: &GasSnapshot) -> BotResult<FlashLoanQuote> {
        let fee_bps = match &self.rpc {
            Some(rpc) => {
                let bps = self.premium_bps(rpc).await?;
                debug!(provider = %self.info.id, premium_bps = %bps, "Aave premium");
                bps
            }
            None => self.info.fee_bps,
        };
        metadata_quote(&self.info, fee_bps, asset, amount, gas)
    }

    fn build_calldata(&self, request: &FlashLoanRequest) -> BotResult<Bytes> {
        let call = IAaveV3Pool::flashLoanSimpleCall {
            receiverAddress: request.receiver,
            asset: request.asset.address,
            amount: request.amount,
            params: request.user_data.clone(),
            referralCode: 0,
        };
        Ok(Bytes::from(call.abi_encode()))
    }
}
