//! Re-validation of a ranked opportunity against the latest quotes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use crate::{
    arbitrage::{spread_pct, OpportunityDetector, ProfitEvaluation},
    types::{ArbitrageOpportunity, GasSnapshot, PriceQuote, VenueKey},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    Expired,
    QuoteMissing,
    SpreadCollapsed,
    Unprofitable,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvalidReason::Expired => "expired",
            InvalidReason::QuoteMissing => "quote missing",
            InvalidReason::SpreadCollapsed => "spread collapsed",
            InvalidReason::Unprofitable => "unprofitable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Revalidation {
    Valid {
        buy_price: Decimal,
        sell_price: Decimal,
        spread_pct: Decimal,
        evaluation: ProfitEvaluation,
    },
    Invalid(InvalidReason),
}

fn find_quote<'a>(quotes: &'a [PriceQuote], key: &VenueKey) -> Option<&'a PriceQuote> {
    quotes.iter().find(|q| q.venue == key.venue && q.chain == key.chain)
}

/// Both legs must still be quoted, the spread must clear the pre-filter and the
/// trade must pass the profitability gate with an estimated loan.
pub fn revalidate(
    opportunity: &ArbitrageOpportunity,
    quotes_by_token: &HashMap<String, Vec<PriceQuote>>,
    detector: &OpportunityDetector,
    gas: &GasSnapshot,
    now: DateTime<Utc>,
) -> Revalidation {
    if opportunity.is_expired(now) {
        return Revalidation::Invalid(InvalidReason::Expired);
    }

    let route = opportunity.route_key();
    let Some(quotes) = quotes_by_token.get(&route.token_id) else {
        return Revalidation::Invalid(InvalidReason::QuoteMissing);
    };
    let (Some(buy), Some(sell)) = (find_quote(quotes, &route.buy), find_quote(quotes, &route.sell)) else {
        return Revalidation::Invalid(InvalidReason::QuoteMissing);
    };

    if sell.price <= buy.price || buy.price <= Decimal::ZERO {
        return Revalidation::Invalid(InvalidReason::SpreadCollapsed);
    }
    let spread = spread_pct(buy.price, sell.price);
    if spread < detector.min_spread_pct() {
        return Revalidation::Invalid(InvalidReason::SpreadCollapsed);
    }

    let evaluation = detector
        .model()
        .evaluate(spread, &detector.estimate_loan(opportunity.borrow_amount, gas));
    if !detector.model().accepts(&evaluation) {
        return Revalidation::Invalid(InvalidReason::Unprofitable);
    }

    Revalidation::Valid {
        buy_price: buy.price,
        sell_price: sell.price,
        spread_pct: spread,
        evaluation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, types::{Chain, TokenPair}};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn gas() -> GasSnapshot {
        GasSnapshot {
            gas_price_gwei: dec!(10),
            native_token_usd: dec!(50),
        }
    }

    fn detector() -> OpportunityDetector {
        OpportunityDetector::new(&Config {
            min_spread_pct: dec!(0.3),
            min_profit_pct: dec!(0.1),
            ..Config::default()
        })
    }

    fn quote(venue: &str, price: Decimal, at: DateTime<Utc>) -> PriceQuote {
        PriceQuote {
            token_id: "WETH".into(),
            venue: venue.into(),
            chain: Chain::Ethereum,
            price,
            liquidity_usd: dec!(1_000_000),
            observed_at: at,
            source: "test".into(),
        }
    }

    fn opportunity(t0: DateTime<Utc>) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            id: "opp".into(),
            token_pair: TokenPair {
                base: "WETH".into(),
                quote: "USDC".into(),
            },
            buy_venue: "uniswap".into(),
            sell_venue: "sushiswap".into(),
            buy_chain: Chain::Ethereum,
            sell_chain: Chain::Ethereum,
            buy_price: dec!(100),
            sell_price: dec!(102),
            spread_pct: dec!(2),
            borrow_amount: dec!(10000),
            gross_profit_estimate: dec!(200),
            net_profit_estimate: dec!(180),
            liquidity_usd: dec!(1_000_000),
            discovered_at: t0,
            expires_at: t0 + Duration::seconds(30),
            priority_score: dec!(1),
        }
    }

    fn market(buy: Decimal, sell: Decimal, at: DateTime<Utc>) -> HashMap<String, Vec<PriceQuote>> {
        HashMap::from([(
            "WETH".to_string(),
            vec![quote("uniswap", buy, at), quote("sushiswap", sell, at)],
        )])
    }

    #[test]
    fn test_still_valid_with_fresh_quotes() {
        let t0 = Utc::now();
        let result = revalidate(&opportunity(t0), &market(dec!(100), dec!(101.5), t0), &detector(), &gas(), t0);
        match result {
            Revalidation::Valid { spread_pct, .. } => assert_eq!(spread_pct, dec!(1.5)),
            other => panic!("expected valid, got {other:?}"),
        }
    }

    #[test]
    fn test_rejected_as_expired_after_ttl() {
        let t0 = Utc::now();
        let later = t0 + Duration::seconds(31);
        let result = revalidate(&opportunity(t0), &market(dec!(100), dec!(102), later), &detector(), &gas(), later);
        assert_eq!(result, Revalidation::Invalid(InvalidReason::Expired));
    }

    #[test]
    fn test_collapsed_and_missing() {
        let t0 = Utc::now();
        let result = revalidate(&opportunity(t0), &market(dec!(100), dec!(100.1), t0), &detector(), &gas(), t0);
        assert_eq!(result, Revalidation::Invalid(InvalidReason::SpreadCollapsed));

        let result = revalidate(&opportunity(t0), &market(dec!(102), dec!(100), t0), &detector(), &gas(), t0);
        assert_eq!(result, Revalidation::Invalid(InvalidReason::SpreadCollapsed));

        let result = revalidate(&opportunity(t0), &HashMap::new(), &detector(), &gas(), t0);
        assert_eq!(result, Revalidation::Invalid(InvalidReason::QuoteMissing));
    }

    #[test]
    fn test_unprofitable_after_costs() {
        let t0 = Utc::now();
        let strict = OpportunityDetector::new(&Config {
            min_profit_pct: dec!(5),
            ..Config::default()
        });
        let result = revalidate(&opportunity(t0), &market(dec!(100), dec!(102), t0), &strict, &gas(), t0);
        assert_eq!(result, Revalidation::Invalid(InvalidReason::Unprofitable));
    }
}
