//! Risk state and gate decisions

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskState {
    pub daily_trade_count: u32,
    pub daily_profit: Decimal,
    pub consecutive_failures: u32,
    pub window_start_utc_day: NaiveDate,
}

impl RiskState {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            daily_trade_count: 0,
            daily_profit: Decimal::ZERO,
            consecutive_failures: 0,
            window_start_utc_day: day,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DenyReason {
    DailyTradeLimit,
    CircuitBreakerOpen,
    BorrowAmountExceeded,
    DailyLossLimit,
    BlacklistedAsset(String),
    BlacklistedVenue(String),
    NoTrustedVenue,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::DailyTradeLimit => f.write_str("daily trade limit"),
            DenyReason::CircuitBreakerOpen => f.write_str("circuit breaker open"),
            DenyReason::BorrowAmountExceeded => f.write_str("borrow amount exceeds limit"),
            DenyReason::DailyLossLimit => f.write_str("daily loss limit"),
            DenyReason::BlacklistedAsset(asset) => write!(f, "blacklisted asset {asset}"),
            DenyReason::BlacklistedVenue(venue) => write!(f, "blacklisted venue {venue}"),
            DenyReason::NoTrustedVenue => f.write_str("no trusted venue"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RiskDecision {
    Allow,
    Deny(DenyReason),
}

impl RiskDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RiskDecision::Allow)
    }
}
