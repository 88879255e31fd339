//! Error classification and recovery actions
//!
//! Per-source and per-opportunity failures never escape the tick; they are mapped
//! to an action here and counted so operators can see them in the stats.

use std::collections::HashMap;
use tracing::Level;
use super::BotError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Drop the failing source for this cycle.
    DropSource,
    /// Exclude the quote from comparison.
    ExcludeQuote,
    /// Mark the provider and fall through to the next ranked one.
    TryNextProvider,
    /// Skip the opportunity this cycle.
    SkipOpportunity { log_level: Level },
    /// Record a failed execution.
    RecordFailure,
    /// Stop before the tick loop starts.
    Halt { reason: String },
}

#[derive(Debug, Default, Clone)]
pub struct ErrorRecovery {
    error_counts: HashMap<String, u32>,
}

impl ErrorRecovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_error(&mut self, error: &BotError) -> RecoveryAction {
        let class = Self::classify(error);
        *self.error_counts.entry(class.to_string()).or_insert(0) += 1;

        match error {
            BotError::SourceUnavailable { .. } | BotError::Network { .. } => RecoveryAction::DropSource,
            BotError::StaleQuote { .. } | BotError::PriceValidation { .. } => RecoveryAction::ExcludeQuote,
            BotError::ProviderUnhealthy { .. } | BotError::Rpc { .. } => RecoveryAction::TryNextProvider,
            BotError::Timeout { operation, .. } if operation.starts_with("quote") => {
                RecoveryAction::TryNextProvider
            }
            BotError::Timeout { operation, .. } if operation.starts_with("fetch") => {
                RecoveryAction::DropSource
            }
            BotError::ExecutionFailed { .. } | BotError::Timeout { .. } => RecoveryAction::RecordFailure,
            BotError::NoHealthyProvider { .. } => RecoveryAction::SkipOpportunity {
                log_level: Level::WARN,
            },
            BotError::OpportunityNotFound(_)
            | BotError::AlreadyDispatched(_)
            | BotError::OpportunityExpired(_)
            | BotError::InvalidStateTransition { .. } => RecoveryAction::SkipOpportunity {
                log_level: Level::DEBUG,
            },
            BotError::Configuration(reason) => RecoveryAction::Halt {
                reason: reason.clone(),
            },
        }
    }

    pub fn classify(error: &BotError) -> &'static str {
        match error {
            BotError::SourceUnavailable { .. } => "source_unavailable",
            BotError::StaleQuote { .. } => "stale_quote",
            BotError::PriceValidation { .. } => "invalid_price",
            BotError::ProviderUnhealthy { .. } => "provider_unhealthy",
            BotError::NoHealthyProvider { .. } => "no_healthy_provider",
            BotError::ExecutionFailed { .. } => "execution_failed",
            BotError::Timeout { .. } => "timeout",
            BotError::Network { .. } => "network",
            BotError::Rpc { .. } => "rpc",
            BotError::Configuration(_) => "configuration",
            BotError::OpportunityNotFound(_) => "opportunity_not_found",
            BotError::AlreadyDispatched(_) => "already_dispatched",
            BotError::OpportunityExpired(_) => "opportunity_expired",
            BotError::InvalidStateTransition { .. } => "invalid_transition",
        }
    }

    pub fn count(&self, class: &str) -> u32 {
        self.error_counts.get(class).copied().unwrap_or(0)
    }

    /// Sorted snapshot for reporting.
    pub fn snapshot(&self) -> Vec<(String, u32)> {
        let mut counts: Vec<_> = self
            .error_counts
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        counts.sort();
        counts
    }
}
