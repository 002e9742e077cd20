//! State module for tracking crawl progress
//!
//! This module provides the resource graph and the per-crawl bookkeeping.
//!
//! # Components
//!
//! - `Resource`: One node of the crawl graph (URL, local path, payload, children)
//! - `ResourceStatus`: Monotonic lifecycle of a resource
//! - `ResourceKind`: HTML, CSS or opaque, selecting the handler
//! - `CrawlState`: Dedup index, occupied names, persisted list and first failure

mod crawl_state;
mod kind;
mod resource;
mod status;

// Re-export main types
pub use crawl_state::{CrawlState, Registration};
pub use kind::ResourceKind;
pub use resource::{Resolution, Resource};
pub use status::ResourceStatus;

pub(crate) use resource::lock;
