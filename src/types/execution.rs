//! Trade execution types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Success,
    Failure,
}

/// Append-only history entry for one completed execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub opportunity_id: String,
    pub provider_id: String,
    pub outcome: ExecutionOutcome,
    pub actual_profit: Decimal,
    pub gas_used: u64,
    pub tx_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub failure_reason: Option<String>,
}

impl ExecutionRecord {
    pub fn success(
        opportunity_id: impl Into<String>,
        provider_id: impl Into<String>,
        actual_profit: Decimal,
        gas_used: u64,
        tx_id: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            opportunity_id: opportunity_id.into(),
            provider_id: provider_id.into(),
            outcome: ExecutionOutcome::Success,
            actual_profit,
            gas_used,
            tx_id,
            timestamp,
            failure_reason: None,
        }
    }

    pub fn failure(
        opportunity_id: impl Into<String>,
        provider_id: impl Into<String>,
        reason: impl Into<String>,
        gas_used: u64,
        tx_id: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            opportunity_id: opportunity_id.into(),
            provider_id: provider_id.into(),
            outcome: ExecutionOutcome::Failure,
            actual_profit: Decimal::ZERO,
            gas_used,
            tx_id,
            timestamp,
            failure_reason: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ExecutionOutcome::Success
    }
}

/// What an executor reports back for a dispatched (or dry-run) trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub tx_id: Option<String>,
    pub success: bool,
    pub actual_profit: Decimal,
    pub gas_used: u64,
    pub execution_time_ms: u64,
    pub error_message: Option<String>,
}
