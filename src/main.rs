//! Flash-loan arbitrage engine - Main Entry Point

use anyhow::Result;
use flashloan_arb_bot::*;
use flashloan_arb_bot::{
    execution::{EngineDeps, ExecutionOrchestrator, OnchainExecutor, SimulatedExecutor, TradeExecutor},
    flash_loan::build_providers,
    network::{connect_rpc, FixedGasOracle, GasOracle, RpcGasOracle},
    prices::{DexScreenerSource, PriceSource},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = CONFIG.clone();

    // Initialize logging
    let _logging_guard = utils::setup_logging(&config.log_dir)?;
    utils::setup_output_directories(&config.log_dir, config.journal_dir.as_deref())?;

    info!("⚡ Flash Loan Arbitrage Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    info!("   Tokens: {}", config.tokens.len());
    info!("   Execution chain: {}", config.execution_chain);
    info!("   Trade size: ${}", config.trade_size_usd);
    info!("   Min spread: {}% | Min profit: {}%", config.min_spread_pct, config.min_profit_pct);
    info!("   Providers: {}", config.providers.iter().map(|p| p.id.as_str()).collect::<Vec<_>>().join(", "));
    info!("   Trade execution: {}", config.enable_trade_execution);

    if let Err(e) = config.validate() {
        error!("❌ Invalid configuration: {}", e);
        return Err(e.into());
    }

    let rpc = match &config.rpc_url {
        Some(url) => match connect_rpc(url, config.execution_chain).await {
            Ok(provider) => Some(provider),
            Err(e) if config.enable_trade_execution => {
                error!("Failed to connect to {} RPC", config.execution_chain);
                return Err(e);
            }
            Err(e) => {
                warn!("⚠️ RPC unavailable, continuing with static gas and fee data: {:#}", e);
                None
            }
        },
        None => None,
    };

    let mut sources: Vec<Arc<dyn PriceSource>> = Vec::new();
    for name in &config.price_sources {
        match name.as_str() {
            "dexscreener" => sources.push(Arc::new(DexScreenerSource::new(
                config.dexscreener_base_url.clone(),
                config.source_timeout(),
            )?)),
            other => warn!("Unknown price source '{}' ignored", other),
        }
    }
    if sources.is_empty() {
        return Err(anyhow::anyhow!("No usable price sources configured"));
    }

    let gas_oracle: Arc<dyn GasOracle> = match &rpc {
        Some(provider) => Arc::new(RpcGasOracle::new(provider.clone(), config.execution_chain)),
        None => Arc::new(FixedGasOracle::new(config.default_gas_price_gwei)),
    };

    let executor: Arc<dyn TradeExecutor> = match (&rpc, config.enable_trade_execution) {
        (Some(provider), true) => {
            info!("🚀 Live execution through {}", config.receiver_contract);
            Arc::new(OnchainExecutor::new(provider.clone(), config.execution_timeout()))
        }
        _ => {
            info!("🧪 Simulated execution (success rate {:.0}%)", config.simulated_success_rate * 100.0);
            Arc::new(SimulatedExecutor::from_config(&config))
        }
    };

    let providers = build_providers(&config, rpc.clone())?;
    let stats_interval = Duration::from_secs(config.stats_interval_secs.max(1));

    let engine = ExecutionOrchestrator::new(
        config,
        EngineDeps {
            sources,
            providers,
            executor,
            gas_oracle,
        },
    )?;
    engine.start().await?;

    let mut stats_timer = time::interval(stats_interval);
    stats_timer.tick().await;

    loop {
        tokio::select! {
            _ = stats_timer.tick() => {
                let stats = engine.stats().await;
                utils::print_session_stats(&stats);
                if stats.circuit_breaker_open {
                    warn!("⚡ Circuit breaker is OPEN, dispatch halted until restart");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("📛 Received shutdown signal, draining in-flight executions...");
                break;
            }
        }
    }

    engine.stop().await?;
    utils::print_session_stats(&engine.stats().await);

    Ok(())
}
