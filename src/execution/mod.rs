//! Trade executors and the orchestrating state machine

pub mod engine;
pub mod orchestrator;
pub mod simulation;

pub use engine::*;
pub use orchestrator::*;
pub use simulation::*;
