//! URL handling module for Sumi-Mirror
//!
//! This module provides URL normalization (the dedup key), host wildcard
//! matching for the URL filter, and the helpers that turn raw references
//! into absolute URLs and local paths into relative links.

mod matcher;
mod normalize;
mod resolve;

// Re-export main functions
pub use matcher::{matches_wildcard, UrlFilter};
pub use normalize::{dedup_key, normalize_parsed, normalize_url};
pub use resolve::{html_unescape, is_supported_reference, relative_link, resolve_reference};
