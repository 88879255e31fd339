//! Gas price oracles

use alloy::providers::Provider;
use async_trait::async_trait;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::debug;
use crate::{
    errors::{BotError, BotResult},
    network::retry::{retry_with_backoff, RetryConfig},
    types::Chain,
    ConcreteProvider,
};

#[async_trait]
pub trait GasOracle: Send + Sync {
    /// Current gas price in gwei.
    async fn current_gas_price(&self, chain: Chain) -> BotResult<Decimal>;
}

/// Constant price, used in simulation mode and as the tick fallback.
#[derive(Debug, Clone)]
pub struct FixedGasOracle {
    gwei: Decimal,
}

impl FixedGasOracle {
    pub fn new(gwei: Decimal) -> Self {
        Self { gwei }
    }
}

#[async_trait]
impl GasOracle for FixedGasOracle {
    async fn current_gas_price(&self, _chain: Chain) -> BotResult<Decimal> {
        Ok(self.gwei)
    }
}

/// `eth_gasPrice` against the execution chain's RPC endpoint.
pub struct RpcGasOracle {
    provider: Arc<ConcreteProvider>,
    chain: Chain,
}

impl RpcGasOracle {
    pub fn new(provider: Arc<ConcreteProvider>, chain: Chain) -> Self {
        Self { provider, chain }
    }
}

#[async_trait]
impl GasOracle for RpcGasOracle {
    async fn current_gas_price(&self, chain: Chain) -> BotResult<Decimal> {
        if chain != self.chain {
            return Err(BotError::Rpc {
                message: format!("no RPC endpoint for {chain}"),
                source: anyhow::anyhow!("gas oracle bound to {}", self.chain),
            });
        }

        let wei = retry_with_backoff(
            || async { Ok(self.provider.get_gas_price().await?) },
            &RetryConfig::for_source(),
            "eth_gasPrice",
        )
        .await?;

        let gwei = wei_to_gwei(wei)?;
        debug!(chain = %chain, gwei = %gwei, "Fetched gas price");
        Ok(gwei)
    }
}

pub fn wei_to_gwei(wei: u128) -> BotResult<Decimal> {
    Decimal::from_u128(wei)
        .map(|w| w / dec!(1_000_000_000))
        .ok_or_else(|| BotError::Rpc {
            message: "gas price out of range".to_string(),
            source: anyhow::anyhow!("{wei} wei"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_oracle_returns_configured_price() {
        let oracle = FixedGasOracle::new(dec!(12.5));
        assert_eq!(oracle.current_gas_price(Chain::Base).await.unwrap(), dec!(12.5));
    }

    #[test]
    fn test_wei_to_gwei() {
        assert_eq!(wei_to_gwei(25_000_000_000).unwrap(), dec!(25));
        assert_eq!(wei_to_gwei(1_500_000_000).unwrap(), dec!(1.5));
    }
}
