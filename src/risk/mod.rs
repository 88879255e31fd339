//! Risk controls gating every execution attempt

pub mod manager;

pub use manager::*;
