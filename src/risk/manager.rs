//! Per-trade risk gate and daily accounting
//!
//! Mutated only when an execution attempt completes or a new UTC day is seen.
//! Denials are values; they never touch the breaker or the history.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use crate::{
    config::Config,
    errors::CircuitBreaker,
    storage::ExecutionLog,
    types::{ArbitrageOpportunity, DenyReason, ExecutionRecord, RiskDecision, RiskState},
};

#[derive(Debug, Clone)]
pub struct RiskLimits {
    pub max_daily_trades: u32,
    pub max_borrow_amount: Decimal,
    pub max_daily_loss: Decimal,
    pub blacklisted_assets: Vec<String>,
    pub blacklisted_venues: Vec<String>,
    pub trusted_venues: Vec<String>,
}

impl RiskLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_daily_trades: config.max_daily_trades,
            max_borrow_amount: config.max_borrow_amount,
            max_daily_loss: config.max_daily_loss,
            blacklisted_assets: config.blacklisted_assets.clone(),
            blacklisted_venues: config.blacklisted_venues.clone(),
            trusted_venues: config.trusted_venues.clone(),
        }
    }
}

fn listed(list: &[String], value: &str) -> bool {
    list.iter().any(|v| v.eq_ignore_ascii_case(value))
}

#[derive(Debug)]
pub struct RiskManager {
    limits: RiskLimits,
    state: RiskState,
    breaker: CircuitBreaker,
    log: ExecutionLog,
    in_flight: u32,
}

impl RiskManager {
    pub fn new(config: &Config, log: ExecutionLog, now: DateTime<Utc>) -> Self {
        Self {
            limits: RiskLimits::from_config(config),
            state: RiskState::new(now.date_naive()),
            breaker: CircuitBreaker::new(config.max_consecutive_failures.max(1)),
            log,
            in_flight: 0,
        }
    }

    /// Resets the daily counters the first time a later UTC day is observed.
    fn roll_over(&mut self, now: DateTime<Utc>) -> bool {
        let today: NaiveDate = now.date_naive();
        if today <= self.state.window_start_utc_day {
            return false;
        }
        info!(
            previous_day = %self.state.window_start_utc_day,
            trades = self.state.daily_trade_count,
            profit = %self.state.daily_profit,
            "📅 New UTC day, resetting daily risk counters"
        );
        self.state.daily_trade_count = 0;
        self.state.daily_profit = Decimal::ZERO;
        self.state.window_start_utc_day = today;
        true
    }

    pub fn gate(
        &mut self,
        opportunity: &ArbitrageOpportunity,
        proposed_amount: Decimal,
        now: DateTime<Utc>,
    ) -> RiskDecision {
        self.roll_over(now);

        let decision = self.check(opportunity, proposed_amount, false);
        if let RiskDecision::Deny(reason) = &decision {
            debug!(opportunity_id = %opportunity.id, %reason, "Risk gate denied");
        }
        decision
    }

    /// Same checks as [`gate`](Self::gate) without recording a day rollover.
    pub fn preview(
        &self,
        opportunity: &ArbitrageOpportunity,
        proposed_amount: Decimal,
        now: DateTime<Utc>,
    ) -> RiskDecision {
        let new_day = now.date_naive() > self.state.window_start_utc_day;
        self.check(opportunity, proposed_amount, new_day)
    }

    fn check(
        &self,
        opportunity: &ArbitrageOpportunity,
        proposed_amount: Decimal,
        new_day: bool,
    ) -> RiskDecision {
        let limits = &self.limits;
        let (trades, profit) = if new_day {
            (0, Decimal::ZERO)
        } else {
            (self.state.daily_trade_count, self.state.daily_profit)
        };

        if trades + self.in_flight >= limits.max_daily_trades {
            return RiskDecision::Deny(DenyReason::DailyTradeLimit);
        }
        if self.breaker.is_open() {
            return RiskDecision::Deny(DenyReason::CircuitBreakerOpen);
        }
        if proposed_amount > limits.max_borrow_amount {
            return RiskDecision::Deny(DenyReason::BorrowAmountExceeded);
        }

        for asset in [&opportunity.token_pair.base, &opportunity.token_pair.quote] {
            if listed(&limits.blacklisted_assets, asset) {
                return RiskDecision::Deny(DenyReason::BlacklistedAsset(asset.clone()));
            }
        }
        for venue in [&opportunity.buy_venue, &opportunity.sell_venue] {
            if listed(&limits.blacklisted_venues, venue) {
                return RiskDecision::Deny(DenyReason::BlacklistedVenue(venue.clone()));
            }
        }
        if !limits.trusted_venues.is_empty()
            && !listed(&limits.trusted_venues, &opportunity.buy_venue)
            && !listed(&limits.trusted_venues, &opportunity.sell_venue)
        {
            return RiskDecision::Deny(DenyReason::NoTrustedVenue);
        }

        if profit <= -limits.max_daily_loss {
            return RiskDecision::Deny(DenyReason::DailyLossLimit);
        }

        RiskDecision::Allow
    }

    /// Reserve a daily-trade slot for an execution about to be spawned.
    pub fn note_dispatched(&mut self) {
        self.in_flight += 1;
    }

    pub fn record_outcome(&mut self, record: ExecutionRecord, now: DateTime<Utc>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.roll_over(now);

        self.state.daily_trade_count += 1;
        if record.is_success() {
            self.state.daily_profit += record.actual_profit;
            self.breaker.record_success();
        } else {
            let reason = record.failure_reason.as_deref().unwrap_or("unknown failure");
            self.breaker.record_failure(reason, now);
        }
        self.state.consecutive_failures = self.breaker.consecutive_failures();

        self.log.append(record);
    }

    /// Counters as of `now`. A day not yet rolled over reads as already reset.
    pub fn state(&self, now: DateTime<Utc>) -> RiskState {
        let mut state = RiskState {
            consecutive_failures: self.breaker.consecutive_failures(),
            ..self.state.clone()
        };
        let today = now.date_naive();
        if today > state.window_start_utc_day {
            state.daily_trade_count = 0;
            state.daily_profit = Decimal::ZERO;
            state.window_start_utc_day = today;
        }
        state
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    pub fn recent_executions(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.log.recent(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chain, TokenPair};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn opportunity() -> ArbitrageOpportunity {
        let t0 = Utc::now();
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
            net_profit_estimate: dec!(150),
            liquidity_usd: dec!(1_000_000),
            discovered_at: t0,
            expires_at: t0 + Duration::seconds(30),
            priority_score: dec!(1),
        }
    }

    fn manager(config: Config, now: DateTime<Utc>) -> RiskManager {
        RiskManager::new(&config, ExecutionLog::in_memory(), now)
    }

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    fn failure(now: DateTime<Utc>) -> ExecutionRecord {
        ExecutionRecord::failure("opp", "p", "reverted", 200_000, None, now)
    }

    #[test]
    fn test_breaker_denies_after_five_failures_until_success() {
        let now = noon(1);
        let mut risk = manager(Config::default(), now);
        let opp = opportunity();

        for _ in 0..4 {
            risk.note_dispatched();
            risk.record_outcome(failure(now), now);
        }
        assert!(risk.gate(&opp, dec!(1000), now).is_allowed());

        risk.note_dispatched();
        risk.record_outcome(failure(now), now);
        assert_eq!(
            risk.gate(&opp, dec!(1000), now),
            RiskDecision::Deny(DenyReason::CircuitBreakerOpen)
        );
        assert_eq!(risk.state(now).consecutive_failures, 5);

        risk.record_outcome(ExecutionRecord::success("opp", "p", dec!(3), 1, None, now), now);
        assert!(risk.gate(&opp, dec!(1000), now).is_allowed());
        assert_eq!(risk.state(now).consecutive_failures, 0);
        assert_eq!(risk.breaker().last_failure_reason(), Some("reverted"));
    }

    #[test]
    fn test_third_trade_same_day_hits_daily_limit() {
        let now = noon(1);
        let config = Config {
            max_daily_trades: 2,
            ..Config::default()
        };
        let mut risk = manager(config, now);
        let opp = opportunity();

        for _ in 0..2 {
            assert!(risk.gate(&opp, dec!(1000), now).is_allowed());
            risk.note_dispatched();
            risk.record_outcome(ExecutionRecord::success("opp", "p", dec!(1), 1, None, now), now);
        }
        let decision = risk.gate(&opp, dec!(1000), now);
        assert_eq!(decision, RiskDecision::Deny(DenyReason::DailyTradeLimit));
        assert_eq!(
            match decision {
                RiskDecision::Deny(reason) => reason.to_string(),
                RiskDecision::Allow => String::new(),
            },
            "daily trade limit"
        );
    }

    #[test]
    fn test_in_flight_counts_toward_daily_limit() {
        let now = noon(1);
        let mut risk = manager(Config { max_daily_trades: 1, ..Config::default() }, now);
        risk.note_dispatched();
        assert!(!risk.gate(&opportunity(), dec!(1000), now).is_allowed());
    }

    #[test]
    fn test_daily_counters_reset_exactly_once() {
        let mut risk = manager(Config { max_daily_trades: 2, ..Config::default() }, noon(1));
        let opp = opportunity();
        for _ in 0..2 {
            risk.note_dispatched();
            risk.record_outcome(ExecutionRecord::success("opp", "p", dec!(4), 1, None, noon(1)), noon(1));
        }
        assert!(!risk.gate(&opp, dec!(1000), noon(1)).is_allowed());

        let next_day = noon(2);
        assert!(risk.gate(&opp, dec!(1000), next_day).is_allowed());
        assert_eq!(risk.state(next_day).daily_trade_count, 0);
        assert_eq!(risk.state(next_day).daily_profit, dec!(0));
        assert!(risk.preview(&opp, dec!(1000), noon(3)).is_allowed());

        risk.note_dispatched();
        risk.record_outcome(ExecutionRecord::success("opp", "p", dec!(4), 1, None, next_day), next_day);
        // same day again: no second reset
        risk.gate(&opp, dec!(1000), next_day + Duration::hours(3));
        assert_eq!(risk.state(next_day).daily_trade_count, 1);
        assert_eq!(risk.state(next_day).window_start_utc_day, next_day.date_naive());
    }

    #[test]
    fn test_state_after_midnight_reads_reset_without_a_gate_call() {
        let mut risk = manager(Config::default(), noon(1));
        risk.note_dispatched();
        risk.record_outcome(ExecutionRecord::success("opp", "p", dec!(7), 1, None, noon(1)), noon(1));
        assert_eq!(risk.state(noon(1)).daily_trade_count, 1);

        let after_midnight = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 5).unwrap();
        let view = risk.state(after_midnight);
        assert_eq!(view.daily_trade_count, 0);
        assert_eq!(view.daily_profit, dec!(0));
        assert_eq!(view.window_start_utc_day, after_midnight.date_naive());

        // read-only: the stored window is untouched
        assert_eq!(risk.state(noon(1)).daily_trade_count, 1);
    }

    #[test]
    fn test_size_and_list_checks() {
        let now = noon(1);
        let config = Config {
            max_borrow_amount: dec!(5000),
            blacklisted_venues: vec!["SushiSwap".into()],
            ..Config::default()
        };
        let mut risk = manager(config, now);
        let opp = opportunity();
        assert_eq!(
            risk.gate(&opp, dec!(6000), now),
            RiskDecision::Deny(DenyReason::BorrowAmountExceeded)
        );
        assert_eq!(
            risk.gate(&opp, dec!(1000), now),
            RiskDecision::Deny(DenyReason::BlacklistedVenue("sushiswap".into()))
        );

        let mut risk = manager(
            Config {
                blacklisted_assets: vec!["weth".into()],
                ..Config::default()
            },
            now,
        );
        assert_eq!(
            risk.gate(&opp, dec!(1000), now),
            RiskDecision::Deny(DenyReason::BlacklistedAsset("WETH".into()))
        );

        let mut risk = manager(
            Config {
                trusted_venues: vec!["curve".into()],
                ..Config::default()
            },
            now,
        );
        assert_eq!(
            risk.gate(&opp, dec!(1000), now),
            RiskDecision::Deny(DenyReason::NoTrustedVenue)
        );
    }

    #[test]
    fn test_daily_loss_limit() {
        let now = noon(1);
        let mut risk = manager(Config { max_daily_loss: dec!(50), ..Config::default() }, now);
        risk.note_dispatched();
        risk.record_outcome(ExecutionRecord::success("opp", "p", dec!(-60), 1, None, now), now);
        assert_eq!(
            risk.gate(&opportunity(), dec!(1000), now),
            RiskDecision::Deny(DenyReason::DailyLossLimit)
        );
        assert_eq!(risk.recent_executions(10).len(), 1);
    }
}
