//! Statistics over a crawled resource graph
//!
//! This module provides functionality for counting crawl outcomes and
//! displaying them.

use crate::state::{Resource, ResourceKind, ResourceStatus};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Number of distinct resources discovered, skipped ones included
    pub total_resources: u64,

    /// Count of resources by status
    pub resources_by_status: HashMap<ResourceStatus, u64>,

    /// Count of fetched resources by kind
    pub resources_by_kind: HashMap<ResourceKind, u64>,

    /// Total size of saved bodies
    pub bytes_saved: u64,

    /// Deepest resource discovered
    pub max_depth: u32,
}

impl CrawlStatistics {
    /// Walks the graph below `roots` and counts every resource once
    pub fn collect(roots: &[Arc<Resource>]) -> Self {
        let mut stats = Self::default();
        let mut visited: HashSet<*const Resource> = HashSet::new();
        let mut pending: Vec<Arc<Resource>> = roots.to_vec();

        while let Some(resource) = pending.pop() {
            if !visited.insert(Arc::as_ptr(&resource)) {
                continue;
            }

            stats.total_resources += 1;
            *stats
                .resources_by_status
                .entry(resource.status())
                .or_insert(0) += 1;
            if let Some(kind) = resource.kind() {
                *stats.resources_by_kind.entry(kind).or_insert(0) += 1;
            }
            if resource.is_saved() {
                stats.bytes_saved += resource.body().len() as u64;
            }
            stats.max_depth = stats.max_depth.max(resource.depth());

            pending.extend(resource.children());
        }

        stats
    }

    pub fn count(&self, status: ResourceStatus) -> u64 {
        self.resources_by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn saved(&self) -> u64 {
        self.count(ResourceStatus::Saved)
    }

    pub fn failed(&self) -> u64 {
        self.count(ResourceStatus::Failed)
    }

    pub fn skipped(&self) -> u64 {
        self.count(ResourceStatus::Skipped)
    }
}

/// Logs statistics at the end of a crawl
pub fn log_statistics(stats: &CrawlStatistics) {
    tracing::info!(
        "Resources: {} discovered, {} saved, {} failed, {} skipped",
        stats.total_resources,
        stats.saved(),
        stats.failed(),
        stats.skipped()
    );
    tracing::info!(
        "Saved {} bytes, deepest resource at depth {}",
        stats.bytes_saved,
        stats.max_depth
    );
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Mirror Statistics ===\n");

    println!("Overview:");
    println!("  Total resources: {}", stats.total_resources);
    println!("  Bytes saved: {}", stats.bytes_saved);
    println!("  Max depth: {}", stats.max_depth);
    println!();

    println!("Resources by Status:");
    for status in ResourceStatus::all_states() {
        let count = stats.count(status);
        if count == 0 {
            continue;
        }
        let percentage = if stats.total_resources > 0 {
            (count as f64 / stats.total_resources as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    println!("Resources by Kind:");
    for kind in [ResourceKind::Html, ResourceKind::Css, ResourceKind::Opaque] {
        if let Some(count) = stats.resources_by_kind.get(&kind) {
            println!("  {}: {}", kind, count);
        }
    }
}
