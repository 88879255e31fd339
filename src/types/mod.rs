//! Core data types and structures

pub mod addresses;
pub mod arbitrage;
pub mod execution;
pub mod flash_loan;
pub mod health;
pub mod prices;
pub mod risk;
pub mod stats;

pub use addresses::*;
pub use arbitrage::*;
pub use execution::*;
pub use flash_loan::*;
pub use health::*;
pub use prices::*;
pub use risk::*;
pub use stats::*;
