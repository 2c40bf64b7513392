//! Audio/Video domain modules.
//!
//! Each component only builds arguments and interprets results; the child
//! processes themselves go through [`crate::ports::process::ProcessRunner`].

pub mod ladder;
pub mod probe;
pub mod thumbnails;
pub mod transcode;
