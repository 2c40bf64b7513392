//! Application layer - Generic services that use ports.

pub mod orchestrator;
pub mod storage;
pub mod worker;
pub mod workspace;
