//! Health monitoring utilities

use chrono::{DateTime, Duration, Utc};
use std::time::Instant;
use crate::{
    errors::CircuitBreaker,
    types::{HealthStatus, ProviderHealth, SourceHealth},
};

/// A source counts as online when its last fetch succeeded within `freshness`.
pub fn run_health_check(
    sources: Vec<SourceHealth>,
    providers: Vec<ProviderHealth>,
    circuit_breaker: &CircuitBreaker,
    start_time: Instant,
    freshness: Duration,
    now: DateTime<Utc>,
) -> HealthStatus {
    let sources_online = sources
        .iter()
        .filter(|s| {
            s.consecutive_failures == 0
                && s.last_success.map(|t| now - t <= freshness).unwrap_or(false)
        })
        .count();

    HealthStatus {
        sources_online,
        sources_total: sources.len(),
        providers_healthy: providers.iter().filter(|p| p.healthy).count(),
        providers_total: providers.len(),
        consecutive_errors: circuit_breaker.consecutive_failures(),
        circuit_breaker_active: circuit_breaker.is_open(),
        uptime_seconds: start_time.elapsed().as_secs(),
        sources,
        providers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_and_healthy_counts() {
        let now = Utc::now();
        let sources = vec![
            SourceHealth {
                name: "fresh".into(),
                last_success: Some(now),
                ..Default::default()
            },
            SourceHealth {
                name: "stale".into(),
                last_success: Some(now - Duration::seconds(120)),
                ..Default::default()
            },
            SourceHealth {
                name: "failing".into(),
                last_success: Some(now),
                consecutive_failures: 2,
                ..Default::default()
            },
        ];
        let mut down = ProviderHealth::new("b");
        down.healthy = false;
        let providers = vec![ProviderHealth::new("a"), down];

        let status = run_health_check(
            sources,
            providers,
            &CircuitBreaker::new(5),
            Instant::now(),
            Duration::seconds(30),
            now,
        );
        assert_eq!(status.sources_online, 1);
        assert_eq!(status.sources_total, 3);
        assert_eq!(status.providers_healthy, 1);
        assert!(!status.circuit_breaker_active);
    }
}
