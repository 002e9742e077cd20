//! Crawl summary types
//!
//! This module defines the data a finished crawl hands to output writers
//! and the error type for writing it.

use crate::output::{CrawlStatistics, ResourceReport};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything known about a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Fingerprint of the configuration file, when loaded from one
    pub config_hash: Option<String>,

    pub output_directory: String,

    /// One tree per seed, in seed order
    pub roots: Vec<ResourceReport>,

    pub statistics: CrawlStatistics,
}

impl CrawlSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}
