//! Opportunity detection, profitability and the active opportunity set

pub mod book;
pub mod calculator;
pub mod detector;

pub use book::*;
pub use calculator::*;
pub use detector::*;
