//! Engine lifecycle and reporting types

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use super::{HealthStatus, RiskState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Idle,
    Scanning,
    Validating,
    Executing,
    Paused,
    Stopped,
}

impl EngineState {
    /// Legal edges of the orchestrator state machine.
    pub fn can_transition_to(self, next: EngineState) -> bool {
        use EngineState::*;
        match (self, next) {
            (Stopped, _) => false,
            (_, Stopped) => true,
            (Idle, Scanning) => true,
            (Scanning, Validating) | (Scanning, Paused) => true,
            (Validating, Executing) | (Validating, Scanning) => true,
            (Executing, Scanning) | (Executing, Validating) => true,
            (Paused, Scanning) => true,
            // pause requested mid-tick
            (Validating, Paused) | (Executing, Paused) => true,
            _ => false,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Idle => "IDLE",
            EngineState::Scanning => "SCANNING",
            EngineState::Validating => "VALIDATING",
            EngineState::Executing => "EXECUTING",
            EngineState::Paused => "PAUSED",
            EngineState::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionCounters {
    pub ticks: u64,
    pub opportunities_detected: u64,
    pub invalidated: u64,
    pub expired: u64,
    pub skipped_risk: u64,
    pub skipped_unprofitable: u64,
    pub skipped_no_provider: u64,
    pub skipped_not_executable: u64,
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub total_profit: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub state: EngineState,
    pub risk: RiskState,
    pub circuit_breaker_open: bool,
    pub last_failure_reason: Option<String>,
    pub counters: ExecutionCounters,
    pub error_counts: Vec<(String, u32)>,
    pub in_flight: usize,
    pub active_opportunities: usize,
    pub uptime_secs: u64,
    pub health: HealthStatus,
}
