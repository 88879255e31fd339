//! Flash loan providers and the registry that ranks them

pub mod aave;
pub mod balancer;
pub mod provider;
pub mod registry;
pub mod uniswap;

pub use aave::*;
pub use balancer::*;
pub use provider::*;
pub use registry::*;
pub use uniswap::*;
