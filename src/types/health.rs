//! Health monitoring types

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceHealth {
    pub name: String,
    pub last_success: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub provider_id: String,
    pub healthy: bool,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub last_probe: Option<DateTime<Utc>>,
}

impl ProviderHealth {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            healthy: true,
            consecutive_failures: 0,
            last_error: None,
            last_probe: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub sources_online: usize,
    pub sources_total: usize,
    pub providers_healthy: usize,
    pub providers_total: usize,
    pub consecutive_errors: u32,
    pub circuit_breaker_active: bool,
    pub uptime_seconds: u64,
    pub sources: Vec<SourceHealth>,
    pub providers: Vec<ProviderHealth>,
}
