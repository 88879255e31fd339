//! Provider registry: ranking, bounded quoting, health and execution parameters

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};
use crate::{
    config::{Config, ProtocolKind, ProviderSettings},
    errors::{BotError, BotResult},
    flash_loan::{
        AaveV3Provider, BalancerV2Provider, FlashLoanProvider, FlashLoanRequest,
        UniswapV3FlashProvider,
    },
    types::{
        aave_v3_pool, asset_info, ArbitrageOpportunity, Chain, ExecutionParams, FlashLoanQuote,
        GasSnapshot, ProviderHealth, ProviderInfo, BALANCER_VAULT, UNISWAP_V3_USDC_WETH_ETHEREUM,
    },
    ConcreteProvider,
};

pub struct ProviderRegistry {
    providers: Vec<Arc<dyn FlashLoanProvider>>,
    health: RwLock<HashMap<String, ProviderHealth>>,
    min_reliability: Decimal,
    failure_threshold: u32,
    quote_timeout: Duration,
    probe_amount: Decimal,
    probe_asset: String,
    receiver: Address,
    gas_limit: u64,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn FlashLoanProvider>>, config: &Config) -> Self {
        let health = providers
            .iter()
            .map(|p| (p.id().to_string(), ProviderHealth::new(p.id())))
            .collect();

        Self {
            providers,
            health: RwLock::new(health),
            min_reliability: config.min_provider_reliability,
            failure_threshold: config.provider_failure_threshold.max(1),
            quote_timeout: config.provider_timeout(),
            probe_amount: config.provider_probe_amount,
            probe_asset: config.quote_asset.clone(),
            receiver: config.receiver_contract,
            gas_limit: config.gas_limit,
        }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Eligible providers, cheapest first. Reliability only breaks fee ties once a
    /// provider clears the minimum.
    pub async fn ranked_providers(
        &self,
        chain: Chain,
        asset: &str,
        amount: Decimal,
    ) -> Vec<Arc<dyn FlashLoanProvider>> {
        let health = self.health.read().await;
        let mut eligible: Vec<_> = self
            .providers
            .iter()
            .filter(|p| {
                let info = p.info();
                health.get(&info.id).map(|h| h.healthy).unwrap_or(false)
                    && info.chain == chain
                    && info.supports(asset)
                    && info.max_capacity_usd >= amount
                    && info.reliability >= self.min_reliability
            })
            .cloned()
            .collect();

        eligible.sort_by(|a, b| {
            let (a, b) = (a.info(), b.info());
            a.fee_bps
                .cmp(&b.fee_bps)
                .then_with(|| b.reliability.cmp(&a.reliability))
                .then_with(|| a.id.cmp(&b.id))
        });
        eligible
    }

    /// Bounded quote. Failures and timeouts count against the provider's health.
    pub async fn quote(
        &self,
        provider: &Arc<dyn FlashLoanProvider>,
        asset: &str,
        amount: Decimal,
        gas: &GasSnapshot,
        now: DateTime<Utc>,
    ) -> BotResult<FlashLoanQuote> {
        let result = match tokio::time::timeout(self.quote_timeout, provider.quote(asset, amount, gas)).await {
            Ok(result) => result,
            Err(_) => Err(BotError::timeout(format!("quote {}", provider.id()), self.quote_timeout)),
        };

        match &result {
            Ok(_) => self.record_success(provider.id(), now).await,
            Err(e) => self.record_failure(provider.id(), &e.to_string(), now).await,
        }
        result
    }

    pub async fn record_success(&self, provider_id: &str, now: DateTime<Utc>) {
        let mut health = self.health.write().await;
        if let Some(h) = health.get_mut(provider_id) {
            if !h.healthy {
                info!("✅ Flash loan provider {} restored", provider_id);
            }
            h.healthy = true;
            h.consecutive_failures = 0;
            h.last_probe = Some(now);
        }
    }

    pub async fn record_failure(&self, provider_id: &str, reason: &str, now: DateTime<Utc>) {
        let mut health = self.health.write().await;
        if let Some(h) = health.get_mut(provider_id) {
            h.consecutive_failures += 1;
            h.last_error = Some(reason.to_string());
            h.last_probe = Some(now);
            if h.healthy && h.consecutive_failures >= self.failure_threshold {
                h.healthy = false;
                warn!(
                    provider = provider_id,
                    failures = h.consecutive_failures,
                    "⚠️ Flash loan provider marked unhealthy: {}",
                    reason
                );
            }
        }
    }

    /// Quote a small amount on every provider; a success restores a degraded one.
    pub async fn probe_all(&self, gas: &GasSnapshot, now: DateTime<Utc>) -> usize {
        let mut healthy = 0;
        for provider in &self.providers {
            if self
                .quote(provider, &self.probe_asset, self.probe_amount, gas, now)
                .await
                .is_ok()
            {
                healthy += 1;
            }
        }
        healthy
    }

    pub async fn health_snapshot(&self) -> Vec<ProviderHealth> {
        let health = self.health.read().await;
        let mut snapshot: Vec<_> = health.values().cloned().collect();
        snapshot.sort_by(|a, b| a.provider_id.cmp(&b.provider_id));
        snapshot
    }

    pub fn build_execution_params(
        &self,
        provider: &Arc<dyn FlashLoanProvider>,
        opportunity: &ArbitrageOpportunity,
        quote: &FlashLoanQuote,
        expected_profit: Decimal,
    ) -> BotResult<ExecutionParams> {
        let info = provider.info();
        let asset = asset_info(info.chain, &quote.asset).ok_or_else(|| BotError::ProviderUnhealthy {
            provider_id: info.id.clone(),
            reason: format!("{} has no address on {}", quote.asset, info.chain),
        })?;

        let request = FlashLoanRequest::for_opportunity(
            self.receiver,
            asset,
            opportunity,
            quote.borrow_amount,
            expected_profit,
        )?;
        let calldata = provider.build_calldata(&request)?;

        Ok(ExecutionParams {
            opportunity_id: opportunity.id.clone(),
            provider_id: info.id.clone(),
            protocol: provider.protocol_name(),
            chain: info.chain,
            target: info.pool,
            asset: asset.address,
            borrow_amount: quote.borrow_amount,
            borrow_units: request.amount,
            calldata,
            gas_limit: self.gas_limit.max(quote.gas_estimate),
            expected_profit,
        })
    }
}

fn provider_info(settings: &ProviderSettings, chain: Chain, pool: Address) -> ProviderInfo {
    ProviderInfo {
        id: settings.id.clone(),
        chain,
        fee_bps: settings.fee_bps,
        reliability: settings.reliability,
        max_capacity_usd: settings.max_capacity_usd,
        supported_assets: settings.supported_assets.clone(),
        pool,
        gas_units: settings.gas_units,
    }
}

/// One provider per configured protocol on the execution chain.
pub fn build_providers(
    config: &Config,
    rpc: Option<Arc<ConcreteProvider>>,
) -> BotResult<Vec<Arc<dyn FlashLoanProvider>>> {
    let chain = config.execution_chain;
    let mut providers: Vec<Arc<dyn FlashLoanProvider>> = Vec::new();

    for settings in &config.providers {
        let provider: Arc<dyn FlashLoanProvider> = match settings.protocol {
            ProtocolKind::AaveV3 => {
                let pool = aave_v3_pool(chain).ok_or_else(|| {
                    BotError::Configuration(format!("Aave V3 is not deployed on {chain}"))
                })?;
                Arc::new(AaveV3Provider::new(provider_info(settings, chain, pool), rpc.clone()))
            }
            ProtocolKind::BalancerV2 => {
                Arc::new(BalancerV2Provider::new(provider_info(settings, chain, BALANCER_VAULT)))
            }
            ProtocolKind::UniswapV3 => {
                if chain != Chain::Ethereum {
                    return Err(BotError::Configuration(format!(
                        "no Uniswap V3 flash pool configured on {chain}"
                    )));
                }
                let usdc = asset_info(chain, "USDC");
                let weth = asset_info(chain, "WETH");
                let (Some(usdc), Some(weth)) = (usdc, weth) else {
                    return Err(BotError::Configuration("USDC/WETH addresses missing".into()));
                };
                Arc::new(UniswapV3FlashProvider::new(
                    provider_info(settings, chain, UNISWAP_V3_USDC_WETH_ETHEREUM),
                    usdc.address,
                    weth.address,
                ))
            }
        };
        info!(
            "🏦 Flash loan provider {} ({}) fee={}bp reliability={}",
            settings.id,
            provider.protocol_name(),
            settings.fee_bps,
            settings.reliability
        );
        providers.push(provider);
    }

    Ok(providers)
}
