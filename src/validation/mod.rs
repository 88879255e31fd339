//! Validation of quotes, liquidity and opportunities

pub mod liquidity;
pub mod opportunity;
pub mod price;

pub use liquidity::*;
pub use opportunity::*;
pub use price::*;
