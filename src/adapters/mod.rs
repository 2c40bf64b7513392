//! Adapters - Concrete implementations of ports.

#[cfg(feature = "aws")]
pub mod aws;

#[cfg(feature = "local")]
pub mod local;

pub mod process;
