//! Error handling and recovery mechanisms

pub mod bot_error;
pub mod recovery;
pub mod circuit_breaker;

pub use bot_error::*;
pub use recovery::*;
pub use circuit_breaker::*;
