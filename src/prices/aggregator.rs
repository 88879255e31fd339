//! Concurrent multi-source quote collection
//!
//! One fetch per (source, token) runs concurrently under its own timeout. A
//! failing source only loses its own quotes for the cycle.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use crate::{
    config::Config,
    errors::{BotError, BotResult},
    prices::PriceSource,
    types::{PriceQuote, SourceHealth, VenueKey},
    validation::{validate_liquidity, validate_price},
};

/// Result of one refresh: usable quotes keyed by token plus the errors absorbed on the way.
#[derive(Debug, Default)]
pub struct PriceRefresh {
    pub quotes: HashMap<String, Vec<PriceQuote>>,
    pub errors: Vec<BotError>,
}

impl PriceRefresh {
    pub fn quote_count(&self) -> usize {
        self.quotes.values().map(Vec::len).sum()
    }
}

pub struct PriceAggregator {
    sources: Vec<Arc<dyn PriceSource>>,
    source_timeout: Duration,
    freshness: ChronoDuration,
    min_liquidity_usd: Decimal,
    health: RwLock<BTreeMap<String, SourceHealth>>,
}

impl PriceAggregator {
    pub fn new(sources: Vec<Arc<dyn PriceSource>>, config: &Config) -> Self {
        let health = sources
            .iter()
            .map(|s| {
                let name = s.name().to_string();
                (
                    name.clone(),
                    SourceHealth {
                        name,
                        ..Default::default()
                    },
                )
            })
            .collect();

        Self {
            sources,
            source_timeout: config.source_timeout(),
            freshness: config.quote_freshness(),
            min_liquidity_usd: config.min_liquidity_usd,
            health: RwLock::new(health),
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub async fn refresh(&self, tokens: &[String], now: DateTime<Utc>) -> PriceRefresh {
        let fetches = self.sources.iter().flat_map(|source| {
            tokens.iter().map(move |token| {
                let source = Arc::clone(source);
                async move {
                    let result = match tokio::time::timeout(
                        self.source_timeout,
                        source.fetch_quotes(token),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(BotError::timeout(
                            format!("fetch {} {}", source.name(), token),
                            self.source_timeout,
                        )),
                    };
                    (source.name().to_string(), result)
                }
            })
        });

        let results = join_all(fetches).await;

        let mut refresh = PriceRefresh::default();
        let mut best: HashMap<String, HashMap<VenueKey, PriceQuote>> = HashMap::new();
        let mut health = self.health.write().await;

        for (source_name, result) in results {
            let entry = health.entry(source_name.clone()).or_insert_with(|| SourceHealth {
                name: source_name.clone(),
                ..Default::default()
            });

            let quotes = match result {
                Ok(quotes) => {
                    entry.last_success = Some(now);
                    entry.consecutive_failures = 0;
                    quotes
                }
                Err(e) => {
                    warn!(source = %source_name, error = %e, "Price source dropped for this cycle");
                    entry.consecutive_failures += 1;
                    entry.total_failures += 1;
                    entry.last_error = Some(e.to_string());
                    refresh.errors.push(e);
                    continue;
                }
            };

            for quote in quotes {
                if let Err(e) = self.admit(&quote, now) {
                    debug!(venue = %quote.venue_key(), error = %e, "Quote excluded");
                    refresh.errors.push(e);
                    continue;
                }
                if let Err(e) = validate_liquidity(quote.liquidity_usd, self.min_liquidity_usd) {
                    debug!(venue = %quote.venue_key(), "{}", e);
                    continue;
                }

                let by_venue = best.entry(quote.token_id.clone()).or_default();
                match by_venue.get(&quote.venue_key()) {
                    Some(existing) if existing.liquidity_usd >= quote.liquidity_usd => {}
                    _ => {
                        by_venue.insert(quote.venue_key(), quote);
                    }
                }
            }
        }

        for (token, by_venue) in best {
            let mut quotes: Vec<PriceQuote> = by_venue.into_values().collect();
            quotes.sort_by(|a, b| a.venue_key().cmp(&b.venue_key()));
            refresh.quotes.insert(token, quotes);
        }

        refresh
    }

    fn admit(&self, quote: &PriceQuote, now: DateTime<Utc>) -> BotResult<()> {
        if !quote.is_fresh(now, self.freshness) {
            return Err(BotError::StaleQuote {
                source_name: quote.source.clone(),
                token_id: quote.token_id.clone(),
                age_secs: quote.age(now).num_seconds(),
            });
        }
        validate_price(quote)
    }

    pub async fn health_snapshot(&self) -> Vec<SourceHealth> {
        self.health.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use crate::types::Chain;

    struct StaticSource {
        name: &'static str,
        quotes: Vec<PriceQuote>,
        delay: Option<Duration>,
        fail: bool,
    }

    #[async_trait]
    impl PriceSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch_quotes(&self, token_id: &str) -> BotResult<Vec<PriceQuote>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(BotError::source_unavailable(self.name, "503"));
            }
            Ok(self
                .quotes
                .iter()
                .filter(|q| q.token_id == token_id)
                .cloned()
                .collect())
        }
    }

    fn quote(venue: &str, price: Decimal, liquidity: Decimal, observed_at: DateTime<Utc>) -> PriceQuote {
        PriceQuote {
            token_id: "WETH".into(),
            venue: venue.into(),
            chain: Chain::Ethereum,
            price,
            liquidity_usd: liquidity,
            observed_at,
            source: "static".into(),
        }
    }

    fn config() -> Config {
        Config {
            source_timeout_secs: 1,
            min_liquidity_usd: dec!(10000),
            ..Config::default()
        }
    }

    fn source(name: &'static str, quotes: Vec<PriceQuote>) -> Arc<dyn PriceSource> {
        Arc::new(StaticSource {
            name,
            quotes,
            delay: None,
            fail: false,
        })
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_sources() {
        let now = Utc::now();
        let good = source("good", vec![quote("uniswap", dec!(100), dec!(50000), now)]);
        let bad: Arc<dyn PriceSource> = Arc::new(StaticSource {
            name: "bad",
            quotes: vec![],
            delay: None,
            fail: true,
        });

        let aggregator = PriceAggregator::new(vec![good, bad], &config());
        let refresh = aggregator.refresh(&["WETH".to_string()], now).await;

        assert_eq!(refresh.quote_count(), 1);
        assert_eq!(refresh.errors.len(), 1);

        let health = aggregator.health_snapshot().await;
        let bad_health = health.iter().find(|h| h.name == "bad").unwrap();
        assert_eq!(bad_health.consecutive_failures, 1);
        assert!(bad_health.last_error.is_some());
        assert!(health.iter().find(|h| h.name == "good").unwrap().last_success.is_some());
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let now = Utc::now();
        let slow: Arc<dyn PriceSource> = Arc::new(StaticSource {
            name: "slow",
            quotes: vec![quote("curve", dec!(100), dec!(50000), now)],
            delay: Some(Duration::from_secs(3)),
            fail: false,
        });
        let fast = source("fast", vec![quote("uniswap", dec!(101), dec!(50000), now)]);

        let aggregator = PriceAggregator::new(vec![slow, fast], &config());
        let refresh = aggregator.refresh(&["WETH".to_string()], now).await;

        assert_eq!(refresh.quote_count(), 1);
        assert!(matches!(refresh.errors[0], BotError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_stale_invalid_and_shallow_quotes_excluded() {
        let now = Utc::now();
        let src = source(
            "mixed",
            vec![
                quote("stale", dec!(100), dec!(50000), now - ChronoDuration::seconds(31)),
                quote("zero", dec!(0), dec!(50000), now),
                quote("shallow", dec!(100), dec!(500), now),
                quote("ok", dec!(100), dec!(50000), now - ChronoDuration::seconds(30)),
            ],
        );

        let aggregator = PriceAggregator::new(vec![src], &config());
        let refresh = aggregator.refresh(&["WETH".to_string()], now).await;

        let venues: Vec<_> = refresh.quotes["WETH"].iter().map(|q| q.venue.as_str()).collect();
        assert_eq!(venues, vec!["ok"]);
        assert!(refresh.errors.iter().any(|e| matches!(e, BotError::StaleQuote { .. })));
        assert!(refresh.errors.iter().any(|e| matches!(e, BotError::PriceValidation { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_venue_keeps_deepest() {
        let now = Utc::now();
        let a = source("a", vec![quote("uniswap", dec!(100), dec!(20000), now)]);
        let b = source("b", vec![quote("uniswap", dec!(100.5), dec!(90000), now)]);

        let aggregator = PriceAggregator::new(vec![a, b], &config());
        let refresh = aggregator.refresh(&["WETH".to_string()], now).await;

        assert_eq!(refresh.quotes["WETH"].len(), 1);
        assert_eq!(refresh.quotes["WETH"][0].price, dec!(100.5));
    }

    #[tokio::test]
    async fn test_token_without_quotes_is_absent() {
        let aggregator = PriceAggregator::new(vec![source("empty", vec![])], &config());
        let refresh = aggregator.refresh(&["NOPE".to_string()], Utc::now()).await;
        assert!(refresh.quotes.is_empty());
        assert!(refresh.errors.is_empty());
    }
}
