//! JSON-RPC provider setup

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use crate::{
    network::retry::{retry_with_backoff, RetryConfig},
    types::Chain,
    ConcreteProvider,
};

/// Connect over HTTP and confirm the endpoint serves the expected chain.
pub async fn connect_rpc(rpc_url: &str, chain: Chain) -> Result<Arc<ConcreteProvider>> {
    let provider: Arc<ConcreteProvider> = Arc::new(
        ProviderBuilder::new()
            .on_http(rpc_url.parse().context("Invalid RPC URL")?)
            .boxed(),
    );

    info!("🔗 Testing connection to {}...", chain);
    let chain_id = retry_with_backoff(
        || async {
            provider
                .get_chain_id()
                .await
                .context("Failed to get chain id")
        },
        &RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 10000,
            exponential_base: 2.0,
        },
        "RPC connection",
    )
    .await
    .map_err(|e| {
        warn!("⚠️ RPC connection attempt failed: {}", e);
        anyhow::anyhow!("RPC connection failed: {}", e)
    })?;

    if chain_id != chain.chain_id() {
        anyhow::bail!(
            "RPC endpoint serves chain id {} but {} expects {}",
            chain_id,
            chain,
            chain.chain_id()
        );
    }

    let block = provider.get_block_number().await.context("Failed to get block number")?;
    info!("✅ Connected to {} at block {}", chain, block);
    Ok(provider)
}
