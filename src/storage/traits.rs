//! Storage trait
//!
//! This module defines the trait interface for persistence backends.

use crate::Result;
use async_trait::async_trait;

/// Persistence backend for mirrored resources
///
/// Paths are relative to the backend's root and use `/` as separator.
/// Implementations must be safe to call from concurrent tasks.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Checks the backend is usable before any fetch happens
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Writes `bytes` at `path`, creating intermediate directories
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Removes everything saved during this crawl
    async fn rollback(&self) -> Result<()>;
}
