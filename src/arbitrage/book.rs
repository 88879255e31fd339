//! Active opportunity set owned by the orchestrator
//!
//! Expiry is enforced on every read. `take` removes an entry atomically so a
//! second dispatch of the same id is rejected.

use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use crate::{
    arbitrage::detector::rank,
    errors::{BotError, BotResult},
    types::ArbitrageOpportunity,
};

const DISPATCHED_MEMORY: usize = 4096;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub refreshed: usize,
    pub expired: usize,
}

#[derive(Debug, Default)]
pub struct OpportunityBook {
    entries: Vec<ArbitrageOpportunity>,
    capacity: usize,
    dispatched: HashSet<String>,
    dispatch_order: VecDeque<String>,
}

impl OpportunityBook {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            dispatched: HashSet::new(),
            dispatch_order: VecDeque::new(),
        }
    }

    /// A route seen again keeps its id, discovery time and expiry; only the
    /// observed prices and derived estimates are refreshed.
    pub fn merge(&mut self, detected: Vec<ArbitrageOpportunity>, now: DateTime<Utc>) -> MergeSummary {
        let mut summary = MergeSummary {
            expired: self.purge_expired(now),
            ..Default::default()
        };

        for fresh in detected {
            let key = fresh.route_key();
            match self.entries.iter_mut().find(|e| e.route_key() == key) {
                Some(existing) => {
                    existing.buy_price = fresh.buy_price;
                    existing.sell_price = fresh.sell_price;
                    existing.spread_pct = fresh.spread_pct;
                    existing.borrow_amount = fresh.borrow_amount;
                    existing.gross_profit_estimate = fresh.gross_profit_estimate;
                    existing.net_profit_estimate = fresh.net_profit_estimate;
                    existing.liquidity_usd = fresh.liquidity_usd;
                    existing.priority_score = fresh.priority_score;
                    summary.refreshed += 1;
                }
                None => {
                    self.entries.push(fresh);
                    summary.added += 1;
                }
            }
        }

        rank(&mut self.entries);
        self.entries.truncate(self.capacity);
        summary
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.is_expired(now));
        before - self.entries.len()
    }

    /// Ranked copies of every unexpired entry.
    pub fn live(&self, now: DateTime<Utc>) -> Vec<ArbitrageOpportunity> {
        self.entries
            .iter()
            .filter(|e| !e.is_expired(now))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str, now: DateTime<Utc>) -> BotResult<ArbitrageOpportunity> {
        match self.entries.iter().find(|e| e.id == id) {
            Some(opp) if opp.is_expired(now) => Err(BotError::OpportunityExpired(id.to_string())),
            Some(opp) => Ok(opp.clone()),
            None if self.dispatched.contains(id) => Err(BotError::AlreadyDispatched(id.to_string())),
            None => Err(BotError::OpportunityNotFound(id.to_string())),
        }
    }

    /// Remove for dispatch. Only the first caller for an id succeeds.
    pub fn take(&mut self, id: &str, now: DateTime<Utc>) -> BotResult<ArbitrageOpportunity> {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return if self.dispatched.contains(id) {
                Err(BotError::AlreadyDispatched(id.to_string()))
            } else {
                Err(BotError::OpportunityNotFound(id.to_string()))
            };
        };

        let opp = self.entries.remove(pos);
        if opp.is_expired(now) {
            return Err(BotError::OpportunityExpired(opp.id));
        }
        self.remember_dispatch(&opp.id);
        Ok(opp)
    }

    /// Drop an entry that failed re-validation.
    pub fn invalidate(&mut self, id: &str) -> Option<ArbitrageOpportunity> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remember_dispatch(&mut self, id: &str) {
        if self.dispatched.insert(id.to_string()) {
            self.dispatch_order.push_back(id.to_string());
        }
        while self.dispatch_order.len() > DISPATCHED_MEMORY {
            if let Some(old) = self.dispatch_order.pop_front() {
                self.dispatched.remove(&old);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chain, TokenPair};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn opp(id: &str, buy: &str, sell: &str, score: Decimal, discovered_at: DateTime<Utc>) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            id: id.to_string(),
            token_pair: TokenPair {
                base: "X".into(),
                quote: "USDC".into(),
            },
            buy_venue: buy.into(),
            sell_venue: sell.into(),
            buy_chain: Chain::Ethereum,
            sell_chain: Chain::Ethereum,
            buy_price: dec!(100),
            sell_price: dec!(102),
            spread_pct: dec!(2),
            borrow_amount: dec!(1000),
            gross_profit_estimate: dec!(20),
            net_profit_estimate: dec!(10),
            liquidity_usd: dec!(100000),
            discovered_at,
            expires_at: discovered_at + Duration::seconds(30),
            priority_score: score,
        }
    }

    #[test]
    fn test_merge_keeps_identity_of_known_route() {
        let t0 = Utc::now();
        let mut book = OpportunityBook::new(10);
        let summary = book.merge(vec![opp("first", "a", "b", dec!(1), t0)], t0);
        assert_eq!(summary.added, 1);

        let mut again = opp("second", "a", "b", dec!(5), t0 + Duration::seconds(5));
        again.sell_price = dec!(103);
        let summary = book.merge(vec![again], t0 + Duration::seconds(5));
        assert_eq!(summary.refreshed, 1);

        let live = book.live(t0 + Duration::seconds(5));
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, "first");
        assert_eq!(live[0].sell_price, dec!(103));
        assert_eq!(live[0].discovered_at, t0);
    }

    #[test]
    fn test_expired_entries_never_returned() {
        let t0 = Utc::now();
        let mut book = OpportunityBook::new(10);
        book.merge(vec![opp("old", "a", "b", dec!(1), t0)], t0);

        let later = t0 + Duration::seconds(31);
        assert!(book.live(later).is_empty());
        assert!(matches!(book.get("old", later), Err(BotError::OpportunityExpired(_))));
        assert!(matches!(book.take("old", later), Err(BotError::OpportunityExpired(_))));
        assert!(book.is_empty());
    }

    #[test]
    fn test_take_is_single_shot() {
        let t0 = Utc::now();
        let mut book = OpportunityBook::new(10);
        book.merge(vec![opp("x", "a", "b", dec!(1), t0)], t0);

        assert!(book.take("x", t0).is_ok());
        assert!(matches!(book.take("x", t0), Err(BotError::AlreadyDispatched(_))));
        assert!(matches!(book.take("nope", t0), Err(BotError::OpportunityNotFound(_))));
    }

    #[test]
    fn test_capacity_keeps_best_ranked() {
        let t0 = Utc::now();
        let mut book = OpportunityBook::new(2);
        book.merge(
            vec![
                opp("low", "a", "b", dec!(1), t0),
                opp("high", "a", "c", dec!(9), t0),
                opp("mid", "b", "c", dec!(5), t0),
            ],
            t0,
        );
        let ids: Vec<_> = book.live(t0).into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec!["high", "mid"]);
        assert!(book.invalidate("mid").is_some());
        assert_eq!(book.len(), 1);
    }
}
