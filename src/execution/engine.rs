//! Trade executors
//!
//! Every protocol submits through the same receiver contract, so execution is a
//! single seam behind [`TradeExecutor`] rather than a per-provider method.

use alloy::{
    providers::Provider,
    rpc::types::eth::TransactionRequest,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use crate::{
    errors::{BotError, BotResult},
    types::{ExecutionParams, ExecutionReport},
    ConcreteProvider,
};

#[async_trait]
pub trait TradeExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Submit and wait for the outcome. A reverted trade is `Ok` with `success == false`.
    async fn execute(&self, params: &ExecutionParams) -> BotResult<ExecutionReport>;

    /// Dry run with no side effects.
    async fn simulate(&self, params: &ExecutionParams) -> BotResult<ExecutionReport>;
}

const PRIORITY_FEE_WEI: u128 = 1_000_000_000;

/// Sends the flash loan call over JSON-RPC and waits for the receipt.
pub struct OnchainExecutor {
    provider: Arc<ConcreteProvider>,
    receipt_timeout: Duration,
}

impl OnchainExecutor {
    pub fn new(provider: Arc<ConcreteProvider>, receipt_timeout: Duration) -> Self {
        Self {
            provider,
            receipt_timeout,
        }
    }

    fn rpc_error(message: impl Into<String>, e: impl Into<anyhow::Error>) -> BotError {
        BotError::Rpc {
            message: message.into(),
            source: e.into(),
        }
    }

    async fn build_transaction(&self, params: &ExecutionParams) -> BotResult<TransactionRequest> {
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| Self::rpc_error("eth_gasPrice", e))?;

        Ok(TransactionRequest::default()
            .to(params.target)
            .input(params.calldata.clone().into())
            .gas_limit(params.gas_limit)
            .max_fee_per_gas(gas_price.saturating_mul(2))
            .max_priority_fee_per_gas(PRIORITY_FEE_WEI))
    }
}

#[async_trait]
impl TradeExecutor for OnchainExecutor {
    fn name(&self) -> &'static str {
        "onchain"
    }

    async fn execute(&self, params: &ExecutionParams) -> BotResult<ExecutionReport> {
        let started = Instant::now();
        let tx = self.build_transaction(params).await?;

        info!("📤 Sending flash loan transaction:");
        info!("   Protocol: {} via {}", params.protocol, params.provider_id);
        info!("   Target: {:?}", params.target);
        info!("   Borrow: {} ({} units)", params.borrow_amount, params.borrow_units);

        let pending_tx = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| Self::rpc_error("Failed to send transaction", e))?;

        let tx_hash = format!("{:?}", pending_tx.tx_hash());
        info!("📡 Transaction sent on {}: {}", params.chain, tx_hash);

        tokio::select! {
            result = pending_tx.get_receipt() => {
                let receipt = result.map_err(|e| Self::rpc_error("Receipt unavailable", e))?;
                let success = receipt.status();
                if success {
                    info!("✅ Transaction confirmed: {:?}", receipt.transaction_hash);
                } else {
                    warn!("❌ Transaction reverted: {:?}", receipt.transaction_hash);
                }
                Ok(ExecutionReport {
                    tx_id: Some(tx_hash),
                    success,
                    // the receiver reverts below minProfit, so a mined trade cleared it
                    actual_profit: if success { params.expected_profit } else { rust_decimal::Decimal::ZERO },
                    gas_used: receipt.gas_used as u64,
                    execution_time_ms: started.elapsed().as_millis() as u64,
                    error_message: (!success).then(|| "transaction reverted".to_string()),
                })
            }
            _ = tokio::time::sleep(self.receipt_timeout) => {
                Err(BotError::timeout(format!("execute {}", params.opportunity_id), self.receipt_timeout))
            }
        }
    }

    async fn simulate(&self, params: &ExecutionParams) -> BotResult<ExecutionReport> {
        let started = Instant::now();
        let tx = self.build_transaction(params).await?;

        match self.provider.call(&tx).await {
            Ok(_) => {
                let gas_used = self
                    .provider
                    .estimate_gas(&tx)
                    .await
                    .map_err(|e| Self::rpc_error("eth_estimateGas", e))?;
                Ok(ExecutionReport {
                    tx_id: None,
                    success: true,
                    actual_profit: params.expected_profit,
                    gas_used: gas_used as u64,
                    execution_time_ms: started.elapsed().as_millis() as u64,
                    error_message: None,
                })
            }
            Err(e) => Ok(ExecutionReport {
                tx_id: None,
                success: false,
                actual_profit: rust_decimal::Decimal::ZERO,
                gas_used: 0,
                execution_time_ms: started.elapsed().as_millis() as u64,
                error_message: Some(format!("eth_call reverted: {e}")),
            }),
        }
    }
}
