//! Custom error types for the engine

use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Price source {source_name} unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    #[error("Stale quote from {source_name} for {token_id}: {age_secs}s old")]
    StaleQuote {
        source_name: String,
        token_id: String,
        age_secs: i64,
    },

    #[error("Price validation failed: {source_name} price {price} is invalid - {reason}")]
    PriceValidation {
        source_name: String,
        price: Decimal,
        reason: String,
    },

    #[error("Flash loan provider {provider_id} unhealthy: {reason}")]
    ProviderUnhealthy {
        provider_id: String,
        reason: String,
    },

    #[error("No healthy flash loan provider for {amount} {asset}")]
    NoHealthyProvider {
        asset: String,
        amount: Decimal,
    },

    #[error("Execution of {opportunity_id} failed: {reason}")]
    ExecutionFailed {
        opportunity_id: String,
        reason: String,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: String,
        after: Duration,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        retry_count: u32,
    },

    #[error("RPC call failed: {message}")]
    Rpc {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Opportunity {0} not found")]
    OpportunityNotFound(String),

    #[error("Opportunity {0} already dispatched")]
    AlreadyDispatched(String),

    #[error("Opportunity {0} expired")]
    OpportunityExpired(String),

    #[error("Invalid state transition {from} -> {to}")]
    InvalidStateTransition {
        from: String,
        to: String,
    },
}

impl BotError {
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        BotError::Timeout {
            operation: operation.into(),
            after,
        }
    }

    pub fn source_unavailable(source_name: impl Into<String>, message: impl ToString) -> Self {
        BotError::SourceUnavailable {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Only configuration problems stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BotError::Configuration(_))
    }
}

pub type BotResult<T> = Result<T, BotError>;
