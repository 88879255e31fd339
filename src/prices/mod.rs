//! Price sources and the quote aggregator

pub mod aggregator;
pub mod sources;

pub use aggregator::*;
pub use sources::*;
