//! Consecutive-failure circuit breaker

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

/// Opens after `threshold` consecutive failures and stays open until a success.
/// There is no cooldown: only a successful execution closes it again.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreaker {
    consecutive_failures: u32,
    threshold: u32,
    opened_at: Option<DateTime<Utc>>,
    last_failure_reason: Option<String>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_failures: 0,
            threshold,
            opened_at: None,
            last_failure_reason: None,
        }
    }

    pub fn record_success(&mut self) {
        if self.opened_at.take().is_some() {
            info!("Circuit breaker CLOSED after successful execution");
        }
        self.consecutive_failures = 0;
    }

    /// Returns true when this failure tripped the breaker.
    pub fn record_failure(&mut self, reason: &str, now: DateTime<Utc>) -> bool {
        self.consecutive_failures += 1;
        self.last_failure_reason = Some(reason.to_string());

        if self.consecutive_failures >= self.threshold && self.opened_at.is_none() {
            self.opened_at = Some(now);
            error!(
                failures = self.consecutive_failures,
                reason, "Circuit breaker OPEN after {} consecutive failures", self.consecutive_failures
            );
            return true;
        }
        false
    }

    pub fn is_open(&self) -> bool {
        self.consecutive_failures >= self.threshold
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    pub fn last_failure_reason(&self) -> Option<&str> {
        self.last_failure_reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_at_threshold_and_closes_on_success() {
        let now = Utc::now();
        let mut breaker = CircuitBreaker::new(3);

        assert!(!breaker.record_failure("revert", now));
        assert!(!breaker.record_failure("revert", now));
        assert!(!breaker.is_open());
        assert!(breaker.record_failure("out of gas", now));
        assert!(breaker.is_open());
        assert_eq!(breaker.opened_at(), Some(now));

        // further failures keep it open without re-tripping
        assert!(!breaker.record_failure("revert", now));
        assert_eq!(breaker.consecutive_failures(), 4);
        assert_eq!(breaker.last_failure_reason(), Some("revert"));

        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.consecutive_failures(), 0);
        assert!(breaker.opened_at().is_none());
        // reason is kept for operators
        assert_eq!(breaker.last_failure_reason(), Some("revert"));
    }
}
