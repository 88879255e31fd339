//! Trade execution simulation

use async_trait::async_trait;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::time::{Duration, Instant};
use tracing::info;
use crate::{
    config::Config,
    errors::BotResult,
    execution::TradeExecutor,
    types::{ExecutionParams, ExecutionReport},
};

const SLIPPAGE_BPS: u32 = 25;

/// Models latency, a success roll and a slippage haircut instead of touching a chain.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    success_rate: f64,
    latency: Duration,
}

impl SimulatedExecutor {
    pub fn new(success_rate: f64, latency: Duration) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
            latency,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.simulated_success_rate,
            Duration::from_millis(config.simulated_latency_ms),
        )
    }

    fn report(&self, params: &ExecutionParams, success: bool, started: Instant) -> ExecutionReport {
        let slippage_factor = dec!(1) - Decimal::from(SLIPPAGE_BPS) / dec!(10000);
        ExecutionReport {
            tx_id: success.then(|| format!("0x{}", uuid::Uuid::new_v4().simple())),
            success,
            actual_profit: if success {
                params.expected_profit * slippage_factor
            } else {
                Decimal::ZERO
            },
            gas_used: params.gas_limit * 7 / 10,
            execution_time_ms: started.elapsed().as_millis() as u64,
            error_message: (!success).then(|| "simulated revert".to_string()),
        }
    }
}

#[async_trait]
impl TradeExecutor for SimulatedExecutor {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn execute(&self, params: &ExecutionParams) -> BotResult<ExecutionReport> {
        let started = Instant::now();
        tokio::time::sleep(self.latency).await;

        let is_successful = rand::random::<f64>() < self.success_rate;
        info!(
            "🎭 Simulated execution {}: success={}, slippage={}bps",
            params.opportunity_id, is_successful, SLIPPAGE_BPS
        );
        Ok(self.report(params, is_successful, started))
    }

    async fn simulate(&self, params: &ExecutionParams) -> BotResult<ExecutionReport> {
        Ok(self.report(params, true, Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, Bytes, U256};
    use crate::types::Chain;

    fn params() -> ExecutionParams {
        ExecutionParams {
            opportunity_id: "opp".into(),
            provider_id: "p".into(),
            protocol: "stub",
            chain: Chain::Ethereum,
            target: Address::ZERO,
            asset: Address::ZERO,
            borrow_amount: dec!(10000),
            borrow_units: U256::from(10_000_000_000u64),
            calldata: Bytes::new(),
            gas_limit: 1_000_000,
            expected_profit: dec!(100),
        }
    }

    #[tokio::test]
    async fn test_certain_success_applies_slippage() {
        let executor = SimulatedExecutor::new(1.0, Duration::from_millis(1));
        let report = executor.execute(&params()).await.unwrap();
        assert!(report.success);
        assert_eq!(report.actual_profit, dec!(99.75));
        assert_eq!(report.gas_used, 700_000);
        assert!(report.tx_id.unwrap().starts_with("0x"));
    }

    #[tokio::test]
    async fn test_certain_failure() {
        let executor = SimulatedExecutor::new(0.0, Duration::ZERO);
        let report = executor.execute(&params()).await.unwrap();
        assert!(!report.success);
        assert_eq!(report.actual_profit, Decimal::ZERO);
        assert!(report.error_message.is_some());
    }
}
