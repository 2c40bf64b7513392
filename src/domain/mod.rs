//! Domain layer - Pure business logic.

use regex::Regex;
use std::sync::LazyLock;

pub mod av;
pub mod hls;
pub mod jobs;

static PATH_SAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid path-safe pattern"));

/// True when `name` can be used as a single storage key or directory segment.
pub fn is_path_safe(name: &str) -> bool {
    PATH_SAFE.is_match(name)
}
