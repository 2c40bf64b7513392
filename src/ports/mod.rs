//! Ports - Trait definitions the application layer is written against.

pub mod process;
pub mod queue;
pub mod repository;
pub mod storage;
