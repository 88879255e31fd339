//! Balancer V2 Vault `flashLoan`

use alloy::{primitives::Bytes, sol, sol_types::SolCall};
use async_trait::async_trait;
use rust_decimal::Decimal;
use crate::{
    errors::BotResult,
    flash_loan::provider::{metadata_quote, FlashLoanProvider, FlashLoanRequest},
    types::{FlashLoanQuote, GasSnapshot, ProviderInfo},
};

sol! {
    interface IBalancerVault {
        function flashLoan(address recipient, address[] tokens, uint256[] amounts, bytes userData) external;
    }
}

pub struct BalancerV2Provider {
    info: ProviderInfo,
}

impl BalancerV2Provider {
    pub fn new(info: ProviderInfo) -> Self {
        Self { info }
    }
}

#[async_trait]
impl FlashLoanProvider for BalancerV2Provider {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    fn protocol_name(&self) -> &'static str {
        "balancer-v2"
    }

    async fn quote(&self, asset: &str, amount: Decimal, gas: &GasSnapshot) -> BotResult<FlashLoanQuote> {
        metadata_quote(&self.info, self.info.fee_bps, asset, amount, gas)
    }

    fn build_calldata(&self, request: &FlashLoanRequest) -> BotResult<Bytes> {
        let call = IBalancerVault::flashLoanCall {
            recipient: request.receiver,
            tokens: vec![request.asset.address],
            amounts: vec![request.amount],
            userData: request.user_data.clone(),
        };
        Ok(Bytes::from(call.abi_encode()))
    }
}
