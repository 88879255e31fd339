//! Arbitrage opportunity types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use super::{Chain, VenueKey};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenPair {
    pub base: String,
    pub quote: String,
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Identifies a buy/sell route independent of the prices observed on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub token_id: String,
    pub buy: VenueKey,
    pub sell: VenueKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub id: String,
    pub token_pair: TokenPair,
    pub buy_venue: String,
    pub sell_venue: String,
    pub buy_chain: Chain,
    pub sell_chain: Chain,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    /// `(sell - buy) / buy * 100`
    pub spread_pct: Decimal,
    /// Flash loan size in quote currency.
    pub borrow_amount: Decimal,
    pub gross_profit_estimate: Decimal,
    pub net_profit_estimate: Decimal,
    /// Shallower of the two sides.
    pub liquidity_usd: Decimal,
    pub discovered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub priority_score: Decimal,
}

impl ArbitrageOpportunity {
    pub fn route_key(&self) -> RouteKey {
        RouteKey {
            token_id: self.token_pair.base.clone(),
            buy: VenueKey {
                venue: self.buy_venue.clone(),
                chain: self.buy_chain,
            },
            sell: VenueKey {
                venue: self.sell_venue.clone(),
                chain: self.sell_chain,
            },
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_cross_chain(&self) -> bool {
        self.buy_chain != self.sell_chain
    }

    /// Chain the flash loan is taken on.
    pub fn execution_chain(&self) -> Chain {
        self.buy_chain
    }

    pub fn direction(&self) -> String {
        format!(
            "Buy on {}@{} → Sell on {}@{}",
            self.buy_venue, self.buy_chain, self.sell_venue, self.sell_chain
        )
    }
}
