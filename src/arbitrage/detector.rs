//! Cross-venue spread detection
//!
//! For every token, each unordered pair of venues is compared in both directions.
//! Spreads under the pre-filter never reach the profitability model; survivors are
//! sized, costed with an estimated loan quote and ranked.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tracing::{debug, trace};
use crate::{
    arbitrage::calculator::{ProfitEvaluation, ProfitabilityModel},
    config::Config,
    types::{ArbitrageOpportunity, FlashLoanQuote, GasSnapshot, PriceQuote, TokenPair},
};

pub struct OpportunityDetector {
    model: ProfitabilityModel,
    quote_asset: String,
    min_spread_pct: Decimal,
    ttl: Duration,
    top_k: usize,
    trade_size_usd: Decimal,
    max_liquidity_share: Decimal,
    allow_cross_chain: bool,
    spread_weight: Decimal,
    profit_weight: Decimal,
    estimate_fee_bps: Decimal,
    estimate_gas_units: u64,
}

pub fn spread_pct(buy_price: Decimal, sell_price: Decimal) -> Decimal {
    (sell_price - buy_price) / buy_price * dec!(100)
}

impl OpportunityDetector {
    pub fn new(config: &Config) -> Self {
        Self {
            model: ProfitabilityModel::new(config),
            quote_asset: config.quote_asset.clone(),
            min_spread_pct: config.min_spread_pct,
            ttl: config.opportunity_ttl(),
            top_k: config.top_k,
            trade_size_usd: config.trade_size_usd,
            max_liquidity_share: config.max_liquidity_share,
            allow_cross_chain: config.allow_cross_chain,
            spread_weight: config.spread_weight,
            profit_weight: config.profit_weight,
            estimate_fee_bps: config.estimate_fee_bps,
            estimate_gas_units: config.estimate_gas_units,
        }
    }

    pub fn model(&self) -> &ProfitabilityModel {
        &self.model
    }

    pub fn min_spread_pct(&self) -> Decimal {
        self.min_spread_pct
    }

    pub fn detect(
        &self,
        quotes_by_token: &HashMap<String, Vec<PriceQuote>>,
        gas: &GasSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<ArbitrageOpportunity> {
        let mut tokens: Vec<&String> = quotes_by_token.keys().collect();
        tokens.sort();

        let mut found = Vec::new();
        for token in tokens {
            let quotes = &quotes_by_token[token];
            if quotes.len() < 2 {
                continue;
            }
            for i in 0..quotes.len() {
                for j in (i + 1)..quotes.len() {
                    let (a, b) = (&quotes[i], &quotes[j]);
                    if a.venue_key() == b.venue_key() {
                        continue;
                    }
                    if let Some(opp) = self.evaluate_pair(token, a, b, gas, now)
                        .or_else(|| self.evaluate_pair(token, b, a, gas, now))
                    {
                        found.push(opp);
                    }
                }
            }
        }

        rank(&mut found);
        found.truncate(self.top_k);
        if !found.is_empty() {
            debug!(count = found.len(), "Detected arbitrage opportunities");
        }
        found
    }

    /// Buy on `buy`, sell on `sell`.
    fn evaluate_pair(
        &self,
        token: &str,
        buy: &PriceQuote,
        sell: &PriceQuote,
        gas: &GasSnapshot,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        if sell.price <= buy.price || buy.price <= Decimal::ZERO {
            return None;
        }
        if buy.chain != sell.chain && !self.allow_cross_chain {
            return None;
        }

        let spread = spread_pct(buy.price, sell.price);
        if spread < self.min_spread_pct {
            trace!(token, spread = %spread, "Spread below pre-filter");
            return None;
        }

        let liquidity = buy.liquidity_usd.min(sell.liquidity_usd);
        let borrow = self.size_borrow(liquidity);
        if borrow <= Decimal::ZERO {
            return None;
        }

        let evaluation = self.model.evaluate(spread, &self.estimate_loan(borrow, gas));
        if !self.model.accepts(&evaluation) {
            debug!(
                token,
                buy = %buy.venue_key(),
                sell = %sell.venue_key(),
                spread = %spread.round_dp(4),
                net = %evaluation.net_profit.round_dp(4),
                "Spread unprofitable after costs"
            );
            return None;
        }

        Some(ArbitrageOpportunity {
            id: uuid::Uuid::new_v4().to_string(),
            token_pair: TokenPair {
                base: token.to_string(),
                quote: self.quote_asset.clone(),
            },
            buy_venue: buy.venue.clone(),
            sell_venue: sell.venue.clone(),
            buy_chain: buy.chain,
            sell_chain: sell.chain,
            buy_price: buy.price,
            sell_price: sell.price,
            spread_pct: spread,
            borrow_amount: borrow,
            gross_profit_estimate: evaluation.gross_profit,
            net_profit_estimate: evaluation.net_profit,
            liquidity_usd: liquidity,
            discovered_at: now,
            expires_at: now + self.ttl,
            priority_score: self.priority_score(spread, &evaluation),
        })
    }

    pub fn size_borrow(&self, liquidity_usd: Decimal) -> Decimal {
        self.trade_size_usd
            .min(liquidity_usd * self.max_liquidity_share)
            .round_dp(2)
    }

    /// Loan quote assumed before a provider has been picked.
    pub fn estimate_loan(&self, borrow: Decimal, gas: &GasSnapshot) -> FlashLoanQuote {
        FlashLoanQuote::new(
            "estimate",
            self.quote_asset.clone(),
            borrow,
            borrow * self.estimate_fee_bps / dec!(10000),
            self.estimate_gas_units,
            gas.cost_usd(self.estimate_gas_units),
            dec!(0.5),
        )
    }

    pub fn priority_score(&self, spread_pct: Decimal, evaluation: &ProfitEvaluation) -> Decimal {
        self.spread_weight * spread_pct + self.profit_weight * evaluation.net_profit
    }
}

/// Highest score first; ties go to deeper liquidity, then to the earlier discovery.
/// The sort is stable so identical entries keep their insertion order.
pub fn rank(opportunities: &mut [ArbitrageOpportunity]) {
    opportunities.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| b.liquidity_usd.cmp(&a.liquidity_usd))
            .then_with(|| a.discovered_at.cmp(&b.discovered_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chain;
    use proptest::prelude::*;

    fn quote(token: &str, venue: &str, chain: Chain, price: Decimal, liquidity: Decimal) -> PriceQuote {
        PriceQuote {
            token_id: token.to_string(),
            venue: venue.to_string(),
            chain,
            price,
            liquidity_usd: liquidity,
            observed_at: Utc::now(),
            source: "test".to_string(),
        }
    }

    fn config() -> Config {
        Config {
            trade_size_usd: dec!(10000),
            max_liquidity_share: dec!(0.1),
            min_spread_pct: dec!(0.3),
            min_profit_pct: dec!(0.5),
            estimate_fee_bps: dec!(9),
            // 100k gas * 10 gwei * 50 USD = 0.05 USD
            estimate_gas_units: 100_000,
            ..Config::default()
        }
    }

    fn gas() -> GasSnapshot {
        GasSnapshot {
            gas_price_gwei: dec!(10),
            native_token_usd: dec!(50),
        }
    }

    fn by_token(quotes: Vec<PriceQuote>) -> HashMap<String, Vec<PriceQuote>> {
        let mut map: HashMap<String, Vec<PriceQuote>> = HashMap::new();
        for q in quotes {
            map.entry(q.token_id.clone()).or_default().push(q);
        }
        map
    }

    #[test]
    fn test_detects_buy_low_sell_high() {
        let detector = OpportunityDetector::new(&config());
        let now = Utc::now();
        let quotes = by_token(vec![
            quote("X", "sushiswap", Chain::Ethereum, dec!(102), dec!(1_000_000)),
            quote("X", "uniswap", Chain::Ethereum, dec!(100), dec!(1_000_000)),
        ]);

        let found = detector.detect(&quotes, &gas(), now);
        assert_eq!(found.len(), 1);
        let opp = &found[0];
        assert_eq!(opp.buy_venue, "uniswap");
        assert_eq!(opp.sell_venue, "sushiswap");
        assert_eq!(opp.spread_pct, dec!(2));
        assert_eq!(opp.borrow_amount, dec!(10000));
        assert_eq!(opp.expires_at, now + Duration::seconds(30));
        assert_eq!(opp.token_pair.quote, "USDC");
        assert!(opp.net_profit_estimate > Decimal::ZERO);
    }

    #[test]
    fn test_pre_filter_and_profit_gate() {
        let detector = OpportunityDetector::new(&config());
        let now = Utc::now();

        // 0.2% never reaches the model
        let quotes = by_token(vec![
            quote("X", "a", Chain::Ethereum, dec!(100), dec!(1_000_000)),
            quote("X", "b", Chain::Ethereum, dec!(100.2), dec!(1_000_000)),
        ]);
        assert!(detector.detect(&quotes, &gas(), now).is_empty());

        // 0.5% passes the pre-filter but not min_profit_pct 0.5 after fees
        let quotes = by_token(vec![
            quote("X", "a", Chain::Ethereum, dec!(100), dec!(1_000_000)),
            quote("X", "b", Chain::Ethereum, dec!(100.5), dec!(1_000_000)),
        ]);
        assert!(detector.detect(&quotes, &gas(), now).is_empty());
    }

    #[test]
    fn test_same_venue_and_cross_chain_pairs_skipped() {
        let detector = OpportunityDetector::new(&config());
        let quotes = by_token(vec![
            quote("X", "uniswap", Chain::Ethereum, dec!(100), dec!(1_000_000)),
            quote("X", "uniswap", Chain::Base, dec!(105), dec!(1_000_000)),
        ]);
        assert!(detector.detect(&quotes, &gas(), Utc::now()).is_empty());

        let detector = OpportunityDetector::new(&Config {
            allow_cross_chain: true,
            ..config()
        });
        let found = detector.detect(&quotes, &gas(), Utc::now());
        assert_eq!(found.len(), 1);
        assert!(found[0].is_cross_chain());
    }

    #[test]
    fn test_borrow_capped_by_liquidity() {
        let detector = OpportunityDetector::new(&config());
        let quotes = by_token(vec![
            quote("X", "a", Chain::Ethereum, dec!(100), dec!(50_000)),
            quote("X", "b", Chain::Ethereum, dec!(103), dec!(2_000_000)),
        ]);
        let found = detector.detect(&quotes, &gas(), Utc::now());
        assert_eq!(found[0].borrow_amount, dec!(5000));
        assert_eq!(found[0].liquidity_usd, dec!(50_000));
    }

    #[test]
    fn test_ranking_and_top_k() {
        let detector = OpportunityDetector::new(&Config {
            top_k: 2,
            ..config()
        });
        let quotes = by_token(vec![
            quote("A", "a", Chain::Ethereum, dec!(100), dec!(1_000_000)),
            quote("A", "b", Chain::Ethereum, dec!(101), dec!(1_000_000)),
            quote("A", "c", Chain::Ethereum, dec!(104), dec!(1_000_000)),
        ]);
        let found = detector.detect(&quotes, &gas(), Utc::now());
        assert_eq!(found.len(), 2);
        assert!(found[0].priority_score >= found[1].priority_score);
        assert_eq!((found[0].buy_venue.as_str(), found[0].sell_venue.as_str()), ("a", "c"));
    }

    #[test]
    fn test_rank_tie_breaks_on_liquidity_then_discovery() {
        let detector = OpportunityDetector::new(&config());
        let now = Utc::now();
        let quotes = by_token(vec![
            quote("X", "a", Chain::Ethereum, dec!(100), dec!(1_000_000)),
            quote("X", "b", Chain::Ethereum, dec!(102), dec!(1_000_000)),
        ]);
        let base = detector.detect(&quotes, &gas(), now).remove(0);

        let mut deeper = base.clone();
        deeper.id = "deeper".into();
        deeper.liquidity_usd = dec!(2_000_000);
        let mut later = base.clone();
        later.id = "later".into();
        later.discovered_at = now + Duration::seconds(1);
        let mut first = base.clone();
        first.id = "first".into();

        let mut all = vec![later, first, deeper];
        rank(&mut all);
        let ids: Vec<_> = all.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["deeper", "first", "later"]);
    }

    proptest! {
        #[test]
        fn prop_every_detected_opportunity_has_positive_spread(
            prices in proptest::collection::vec(50u32..150, 2..6),
        ) {
            let detector = OpportunityDetector::new(&Config {
                min_spread_pct: dec!(0),
                min_profit_pct: dec!(-1000),
                ..config()
            });
            let quotes = by_token(
                prices
                    .iter()
                    .enumerate()
                    .map(|(i, p)| quote("X", &format!("v{i}"), Chain::Ethereum, Decimal::from(*p), dec!(1_000_000)))
                    .collect(),
            );
            for opp in detector.detect(&quotes, &gas(), Utc::now()) {
                prop_assert!(opp.sell_price > opp.buy_price);
                prop_assert!(opp.spread_pct > Decimal::ZERO);
                prop_assert_eq!(opp.spread_pct, spread_pct(opp.buy_price, opp.sell_price));
            }
        }
    }
}
