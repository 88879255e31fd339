//! Flash-loan arbitrage decision engine
//!
//! Aggregates DEX quotes across venues and chains, detects cross-venue spreads,
//! prices them against real flash-loan quotes, gates them through risk controls
//! and drives execution through a single orchestrated state machine.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod prices;
pub mod arbitrage;
pub mod flash_loan;
pub mod risk;
pub mod execution;
pub mod validation;
pub mod utils;
pub mod storage;

// Re-export commonly used items
pub use config::{Config, CONFIG};
pub use errors::{BotError, BotResult};
pub use types::*;

// Type alias for our concrete provider
pub type ConcreteProvider = alloy::providers::RootProvider<alloy::transports::BoxTransport>;
