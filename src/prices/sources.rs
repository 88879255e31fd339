//! External price sources

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::prelude::*;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use crate::{
    errors::{BotError, BotResult},
    network::retry::{retry_with_backoff, RetryConfig},
    types::{Chain, PriceQuote},
};

#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    /// Every venue quote this source currently has for `token_id`.
    async fn fetch_quotes(&self, token_id: &str) -> BotResult<Vec<PriceQuote>>;
}

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    chain_id: String,
    dex_id: String,
    base_token: DexToken,
    price_usd: Option<String>,
    liquidity: Option<DexLiquidity>,
}

#[derive(Debug, Deserialize)]
struct DexToken {
    address: String,
}

#[derive(Debug, Deserialize)]
struct DexLiquidity {
    usd: Option<f64>,
}

/// DexScreener token-pairs endpoint: one quote per pool listing the token as base.
pub struct DexScreenerSource {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl DexScreenerSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BotResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Network {
                message: "Failed to build HTTP client".to_string(),
                source: Some(e.into()),
                retry_count: 0,
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryConfig::for_source(),
        })
    }

    fn parse_pairs(&self, token_id: &str, body: TokenPairsResponse) -> Vec<PriceQuote> {
        let observed_at = Utc::now();
        body.pairs
            .unwrap_or_default()
            .into_iter()
            .filter(|pair| pair.base_token.address.eq_ignore_ascii_case(token_id))
            .filter_map(|pair| {
                let chain = match pair.chain_id.parse::<Chain>() {
                    Ok(chain) => chain,
                    Err(_) => {
                        debug!(chain = %pair.chain_id, "Skipping pair on unsupported chain");
                        return None;
                    }
                };
                let price = Decimal::from_str(pair.price_usd.as_deref()?).ok()?;
                let liquidity_usd = pair
                    .liquidity
                    .and_then(|l| l.usd)
                    .and_then(Decimal::from_f64)
                    .unwrap_or(Decimal::ZERO);

                Some(PriceQuote {
                    token_id: token_id.to_string(),
                    venue: pair.dex_id,
                    chain,
                    price,
                    liquidity_usd,
                    observed_at,
                    source: self.name().to_string(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl PriceSource for DexScreenerSource {
    fn name(&self) -> &str {
        "dexscreener"
    }

    async fn fetch_quotes(&self, token_id: &str) -> BotResult<Vec<PriceQuote>> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, token_id);

        let body = retry_with_backoff(
            || async {
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .context("HTTP request failed")?;

                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    warn!("⚠️ DexScreener returned error status {}: {}", status, text);
                    anyhow::bail!("DexScreener API error: {} - {}", status, text);
                }

                response
                    .json::<TokenPairsResponse>()
                    .await
                    .context("Failed to parse JSON response")
            },
            &self.retry,
            "DexScreener quote fetch",
        )
        .await
        .map_err(|e| BotError::source_unavailable(self.name(), e))?;

        let quotes = self.parse_pairs(token_id, body);
        debug!(token = token_id, count = quotes.len(), "DexScreener quotes");
        Ok(quotes)
    }
}
