//! Configuration module for Sumi-Mirror
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirroring into {}", config.output.directory.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_recursive_sources, default_sources, ActiveSource, Config, CrawlerConfig,
    FilenameStrategy, MissingSourcesPolicy, OutputConfig, RequestConfig, SeedEntry, SourceRule,
    SubdirectoryRule, UserAgentConfig, DEFAULT_FILENAME, DEFAULT_ROOT_CONCURRENCY,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
