//! Data persistence and file operations

pub mod executions;
pub mod opportunities;

pub use executions::*;
pub use opportunities::*;
