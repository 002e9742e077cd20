//! Storage module for persisting mirrored resources
//!
//! This module handles where the mirror ends up:
//! - A filesystem directory that must not exist before the crawl
//! - An in-memory buffer for dry runs and tests
//! - Rollback of everything written when a crawl fails

mod fs;
mod memory;
mod traits;

pub use fs::FsStorage;
pub use memory::MemoryStorage;
pub use traits::Storage;

use std::path::{Component, Path, PathBuf};

/// Joins a relative storage path onto `root`
///
/// Returns `None` for empty paths and for paths with any component other
/// than a plain name (`..`, `.`, a root or a drive prefix).
pub(crate) fn resolve_within(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let mut joined = root.to_path_buf();
    let mut components = 0;
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                joined.push(name);
                components += 1;
            }
            _ => return None,
        }
    }
    (components > 0).then_some(joined)
}
