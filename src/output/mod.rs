//! Output module for crawl reports and summaries
//!
//! This module handles:
//! - Per-seed resource trees returned by a crawl
//! - Crawl statistics, logged at the end of every crawl
//! - Markdown summaries written by the CLI

mod markdown;
mod report;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use report::ResourceReport;
pub use stats::{log_statistics, print_statistics, CrawlStatistics};
pub use summary::{CrawlSummary, OutputError, OutputResult};
