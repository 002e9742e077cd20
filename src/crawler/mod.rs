//! Crawler module for mirroring resource graphs
//!
//! This module contains the core mirroring logic, including:
//! - Fetching over HTTP or from local files
//! - Fetch concurrency limits and task tracking
//! - Deduplicated resolution of the resource graph
//! - The `Mirror` entry point and its builder

mod coordinator;
mod fetcher;
mod mirror;
mod scheduler;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, FetchResponse, Fetcher, HttpFetcher, RequestOptions};
pub use mirror::{Mirror, MirrorBuilder};
pub use scheduler::Scheduler;

use crate::config::Config;
use crate::output::ResourceReport;
use crate::Result;

/// Mirrors the configured seeds with the default fetcher and storage
///
/// This is the main entry point for a mirror run. It will:
/// 1. Validate the configuration
/// 2. Check the output directory does not exist yet
/// 3. Fetch every seed and, recursively, the resources it references
/// 4. Rewrite references to local relative paths
/// 5. Save everything, or roll back on the first error
///
/// # Arguments
///
/// * `config` - The mirror configuration
///
/// # Returns
///
/// * `Ok(Vec<ResourceReport>)` - One report per seed, in seed order
/// * `Err(MirrorError)` - The first fatal error; nothing is left on disk
pub async fn scrape(config: Config) -> Result<Vec<ResourceReport>> {
    Mirror::new(config)?.scrape().await
}
